//! # Overlap Join
//!
//! Classifies inbound requests and runs the manual nested-loop join:
//!
//! 1. Driver query (caller 0 plus `filter-0`), one page
//! 2. Per driver row, one join query per secondary caller, issued
//!    concurrently up to `engine.join_concurrency`
//! 3. Results re-associated by `(row, caller)` and assembled in caller
//!    order
//!
//! Continuations skip query building: `scrollId` resumes the driver
//! stream and fans out fresh joins for the new page, `subScrollId`
//! resumes one join stream and returns its raw page.

mod errors;
mod orchestrator;
mod request;

pub use errors::{CursorKind, ErrorResponse, OverlapError, OverlapResult};
pub use orchestrator::JoinOrchestrator;
pub use request::{CallerSet, CallerSlot, DriverMode, JoinRequest, QueryRequest, RequestMode};
