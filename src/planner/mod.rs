//! Query planning for the overlap join
//!
//! Turns parsed filters and join keys into [`QueryExpr`] trees that a
//! [`SearchBackend`](crate::backend::SearchBackend) can execute.
//!
//! # Queries
//!
//! - Driver: `caller == driver` AND driver filters (top-level fields)
//! - Join: `caller == secondary` AND nested event with
//!   `caller == driver` and equal `chrom_number`, `end`, `sample_id`,
//!   `start`, AND join filters (nested fields)

mod ast;
mod builder;

pub use ast::{QueryExpr, SortDirection, SortSpec};
pub use builder::{JoinKey, PredicateBuilder, CALLER_FIELD, JOIN_KEY_FIELDS};
