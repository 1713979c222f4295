//! In-memory search backend
//!
//! Evaluates [`QueryExpr`] trees against JSON documents and keeps scroll
//! contexts with a time-to-live that is extended on every successful
//! scroll. Used by tests and by the `memory` backend configuration.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::planner::{QueryExpr, SortDirection, SortSpec};

use super::errors::{BackendError, BackendResult};
use super::page::{Hit, RawPage, ScrollId, SearchRequest};
use super::{BackendFuture, SearchBackend};

struct ScrollContext {
    remaining: VecDeque<Hit>,
    page_size: usize,
    total: u64,
    expires_at: Instant,
}

/// Search backend holding documents in memory
pub struct MemoryBackend {
    indices: RwLock<HashMap<String, Vec<Value>>>,
    scrolls: Mutex<HashMap<String, ScrollContext>>,
    search_calls: AtomicUsize,
    scroll_calls: AtomicUsize,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("search_calls", &self.search_count())
            .field("scroll_calls", &self.scroll_count())
            .finish()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
            scrolls: Mutex::new(HashMap::new()),
            search_calls: AtomicUsize::new(0),
            scroll_calls: AtomicUsize::new(0),
        }
    }

    /// Load documents from a JSON file shaped `{"index": [doc, ...]}`
    pub fn from_fixtures(path: &Path) -> BackendResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BackendError::Fixtures(format!("failed to read {}: {}", path.display(), e))
        })?;
        let indices: HashMap<String, Vec<Value>> = serde_json::from_str(&content).map_err(|e| {
            BackendError::Fixtures(format!("invalid fixtures {}: {}", path.display(), e))
        })?;

        let backend = Self::new();
        for (index, docs) in indices {
            backend.insert_many(&index, docs);
        }
        Ok(backend)
    }

    pub fn insert(&self, index: &str, doc: Value) {
        self.insert_many(index, std::iter::once(doc));
    }

    pub fn insert_many(&self, index: &str, docs: impl IntoIterator<Item = Value>) {
        let mut indices = self.indices.write().unwrap_or_else(|e| e.into_inner());
        indices.entry(index.to_string()).or_default().extend(docs);
    }

    /// Number of `search` calls served
    pub fn search_count(&self) -> usize {
        self.search_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of `scroll` calls served
    pub fn scroll_count(&self) -> usize {
        self.scroll_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of scroll contexts still held
    pub fn live_scrolls(&self) -> usize {
        self.scrolls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop every live scroll context
    pub fn expire_scrolls(&self) {
        self.scrolls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn run_search(&self, request: &SearchRequest) -> BackendResult<RawPage> {
        self.search_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let indices = self.indices.read().unwrap_or_else(|e| e.into_inner());

        let mut matched: Vec<(&str, usize, &Value)> = Vec::new();
        for name in &request.indices {
            let docs = indices
                .get(name)
                .ok_or_else(|| BackendError::IndexNotFound(name.clone()))?;
            matched.extend(
                docs.iter()
                    .enumerate()
                    .filter(|(_, doc)| matches(&request.query, doc))
                    .map(|(pos, doc)| (name.as_str(), pos, doc)),
            );
        }

        if let Some(sort) = &request.sort {
            matched.sort_by(|(_, _, a), (_, _, b)| compare_for_sort(a, b, sort));
        }

        let total = matched.len() as u64;
        let mut hits: VecDeque<Hit> = matched
            .into_iter()
            .map(|(index, pos, doc)| project(index, pos, doc, &request.fields))
            .collect();

        let size = request.size.max(1);
        let take = size.min(hits.len());
        let page: Vec<Hit> = hits.drain(..take).collect();

        let next = if hits.is_empty() {
            None
        } else {
            let now = Instant::now();
            let id = Uuid::new_v4().to_string();
            let mut scrolls = self.scrolls.lock().unwrap_or_else(|e| e.into_inner());
            scrolls.retain(|_, ctx| ctx.expires_at > now);
            scrolls.insert(
                id.clone(),
                ScrollContext {
                    remaining: hits,
                    page_size: size,
                    total,
                    expires_at: now + request.scroll_ttl,
                },
            );
            Some(ScrollId::new(id))
        };

        Ok(RawPage {
            total,
            hits: page,
            next,
        })
    }

    fn run_scroll(&self, cursor: &ScrollId, ttl: Duration) -> BackendResult<RawPage> {
        self.scroll_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let now = Instant::now();
        let mut scrolls = self.scrolls.lock().unwrap_or_else(|e| e.into_inner());
        scrolls.retain(|_, ctx| ctx.expires_at > now);

        let ctx = scrolls
            .get_mut(cursor.as_str())
            .ok_or_else(|| BackendError::CursorNotFound(cursor.to_string()))?;

        let take = ctx.page_size.min(ctx.remaining.len());
        let hits: Vec<Hit> = ctx.remaining.drain(..take).collect();
        let total = ctx.total;

        let next = if ctx.remaining.is_empty() {
            scrolls.remove(cursor.as_str());
            None
        } else {
            ctx.expires_at = now + ttl;
            Some(cursor.clone())
        };

        Ok(RawPage { total, hits, next })
    }
}

impl SearchBackend for MemoryBackend {
    fn search<'a>(&'a self, request: &'a SearchRequest) -> BackendFuture<'a, RawPage> {
        let result = self.run_search(request);
        Box::pin(async move { result })
    }

    fn scroll<'a>(&'a self, cursor: &'a ScrollId, ttl: Duration) -> BackendFuture<'a, RawPage> {
        let result = self.run_scroll(cursor, ttl);
        Box::pin(async move { result })
    }
}

/// Resolve a dotted path, returning the matching values (arrays flattened)
fn resolve<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    match current {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Wrap a nested element back under its path so dotted field names resolve
fn rewrap(path: &str, element: &Value) -> Value {
    path.rsplit('.').fold(element.clone(), |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

fn matches(expr: &QueryExpr, doc: &Value) -> bool {
    match expr {
        QueryExpr::Term { field, value } => resolve(doc, field).iter().any(|v| value_eq(v, value)),
        QueryExpr::Range { field, gte, lte } => resolve(doc, field).iter().any(|v| {
            let above = gte
                .as_deref()
                .map_or(true, |b| matches!(compare(v, b), Some(Ordering::Greater | Ordering::Equal)));
            let below = lte
                .as_deref()
                .map_or(true, |b| matches!(compare(v, b), Some(Ordering::Less | Ordering::Equal)));
            above && below
        }),
        QueryExpr::Nested { path, query } => resolve(doc, path)
            .iter()
            .any(|element| matches(query, &rewrap(path, element))),
        QueryExpr::Bool { must } => must.iter().all(|q| matches(q, doc)),
    }
}

fn value_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

fn compare(value: &Value, bound: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => n.as_f64()?.partial_cmp(&bound.parse::<f64>().ok()?),
        Value::String(s) => match (s.parse::<f64>(), bound.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(s.as_str().cmp(bound)),
        },
        _ => None,
    }
}

fn compare_for_sort(a: &Value, b: &Value, sort: &SortSpec) -> Ordering {
    let a = resolve(a, &sort.field).into_iter().next();
    let b = resolve(b, &sort.field).into_iter().next();

    // Missing values sort last in both directions
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    };

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn project(index: &str, pos: usize, doc: &Value, fields: &[String]) -> Hit {
    let id = match doc.get("_id") {
        Some(Value::String(id)) => id.clone(),
        _ => format!("{}-{}", index, pos),
    };

    let mut hit = Hit::new(index, id);
    for field in fields {
        let values: Vec<Value> = resolve(doc, field).into_iter().cloned().collect();
        if !values.is_empty() {
            hit.fields.insert(field.clone(), values);
        }
    }
    hit
}
