//! # Search Backend
//!
//! The document index the overlap join runs against. The engine only needs
//! two calls:
//!
//! - `search`: run a query, return the first page and a scroll cursor
//! - `scroll`: continue a cursor, return the next page
//!
//! Cursors are opaque to the engine. Their lifetime is owned by the
//! backend; every successful scroll extends it by the requested TTL.

mod elastic;
mod errors;
mod memory;
mod page;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BackendConfig;

pub use elastic::ElasticBackend;
pub use errors::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use page::{Hit, RawPage, ScrollId, SearchRequest};

/// Boxed future returned by backend calls
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = BackendResult<T>> + Send + 'a>>;

/// A searchable document index with resumable result streams
pub trait SearchBackend: Send + Sync + std::fmt::Debug {
    /// Run a query and return its first page
    fn search<'a>(&'a self, request: &'a SearchRequest) -> BackendFuture<'a, RawPage>;

    /// Continue a result stream from `cursor`, keeping it alive for `ttl`
    fn scroll<'a>(&'a self, cursor: &'a ScrollId, ttl: Duration) -> BackendFuture<'a, RawPage>;
}

/// Build the backend described by the configuration
pub fn connect(config: &BackendConfig) -> BackendResult<Arc<dyn SearchBackend>> {
    match config {
        BackendConfig::Elasticsearch { url, timeout_secs } => Ok(Arc::new(ElasticBackend::new(
            url.as_str(),
            Duration::from_secs(*timeout_secs),
        )?)),
        BackendConfig::Memory { fixtures: Some(path) } => {
            Ok(Arc::new(MemoryBackend::from_fixtures(path)?))
        }
        BackendConfig::Memory { fixtures: None } => Ok(Arc::new(MemoryBackend::new())),
    }
}
