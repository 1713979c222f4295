//! # Overlap Responses
//!
//! Output shapes of the overlap join and their wire format:
//!
//! ```json
//! {
//!   "result_total": 120,
//!   "scroll_id": "...",
//!   "combined_results": [
//!     { "dataset-0": { "_index": "...", "_id": "...", "fields": { ... } },
//!       "dataset-1": { "scroll_id": null, "hits": [ ... ] } }
//!   ]
//! }
//! ```
//!
//! A sub-scroll continuation answers `{ "scroll_id": ..., "hits": [ ... ] }`.

mod assembler;
mod types;

pub use assembler::assemble;
pub use types::{CombinedResult, JoinOutcome, JoinResult, OverlapResponse, RowResult, SubScrollPage};
