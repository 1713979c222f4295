//! Search requests, hits and pages

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::planner::{QueryExpr, SortSpec};

/// Opaque continuation token for a paginated result stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrollId(String);

impl ScrollId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScrollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One matched document, with the requested fields as value lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub fields: BTreeMap<String, Vec<Value>>,
}

impl Hit {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), vec![value]);
        self
    }

    /// First value of a field rendered as a string.
    ///
    /// Null, object and array values count as absent.
    pub fn field_str(&self, name: &str) -> Option<String> {
        match self.fields.get(name)?.first()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// One page of a search or scroll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// Total matches of the underlying query
    pub total: u64,
    /// Matches on this page
    pub hits: Vec<Hit>,
    /// Cursor for the next page, absent once the stream is exhausted
    pub next: Option<ScrollId>,
}

/// A query to run against one or more indices
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub indices: Vec<String>,
    pub query: QueryExpr,
    pub sort: Option<SortSpec>,
    /// Fields returned on every hit
    pub fields: Vec<String>,
    /// Page size
    pub size: usize,
    /// How long the backend keeps the scroll context alive
    pub scroll_ttl: Duration,
}
