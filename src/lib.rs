//! genomic-overlap - overlap joins across variant callers
//!
//! Finds, for each variant reported by a driver caller, the variants other
//! callers reported at the same coordinates, using a document search index
//! as storage. Driver results and every per-row join are paged
//! independently through resumable scroll cursors.

pub mod backend;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod filter;
pub mod http_server;
pub mod join;
pub mod observability;
pub mod planner;
pub mod response;

pub use config::ServiceConfig;
pub use join::{JoinOrchestrator, OverlapError, OverlapResult, QueryRequest};
pub use response::{CombinedResult, OverlapResponse};
