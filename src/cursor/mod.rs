//! # Pagination Cursors
//!
//! Runs queries and resumes the two kinds of paginated stream: the driver
//! stream and per-row join streams. Expiry is tracked by the backend; this
//! layer forwards the configured TTL on every call and maps backend
//! failures to [`OverlapError`]. Resumption is never retried: a scroll
//! that fails may already have advanced the backend's context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::backend::{BackendError, RawPage, ScrollId, SearchBackend, SearchRequest};
use crate::join::{CursorKind, OverlapError, OverlapResult};

/// Executes queries and resumes cursors against a search backend
#[derive(Debug, Clone)]
pub struct CursorManager {
    backend: Arc<dyn SearchBackend>,
    ttl: Duration,
}

impl CursorManager {
    pub fn new(backend: Arc<dyn SearchBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run a fresh query and return its first page
    pub async fn execute(&self, request: &SearchRequest) -> OverlapResult<RawPage> {
        let started = Instant::now();
        let page = self
            .backend
            .search(request)
            .await
            .map_err(|e| OverlapError::BackendQuery(e.to_string()))?;

        debug!(
            hits = page.hits.len(),
            total = page.total,
            more = page.next.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search executed"
        );
        Ok(page)
    }

    /// Fetch the next driver page
    pub async fn resume_driver(&self, cursor: &ScrollId) -> OverlapResult<RawPage> {
        self.resume(cursor, CursorKind::Driver).await
    }

    /// Fetch the next page of one join stream
    pub async fn resume_sub(&self, cursor: &ScrollId) -> OverlapResult<RawPage> {
        self.resume(cursor, CursorKind::Sub).await
    }

    async fn resume(&self, cursor: &ScrollId, kind: CursorKind) -> OverlapResult<RawPage> {
        let started = Instant::now();
        match self.backend.scroll(cursor, self.ttl).await {
            Ok(page) => {
                debug!(
                    cursor_kind = %kind,
                    hits = page.hits.len(),
                    more = page.next.is_some(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cursor resumed"
                );
                Ok(page)
            }
            Err(BackendError::CursorNotFound(_)) => {
                warn!(cursor_kind = %kind, "cursor expired or unknown");
                Err(OverlapError::CursorExpired {
                    kind,
                    cursor: cursor.to_string(),
                })
            }
            Err(e) => {
                warn!(cursor_kind = %kind, error = %e, "cursor resume failed");
                Err(OverlapError::BackendQuery(e.to_string()))
            }
        }
    }
}
