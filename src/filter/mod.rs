//! # Filter Expressions
//!
//! Compact filter language used by the `filter-N` request parameters.
//!
//! A filter list is a comma-separated sequence of `field<op>value`
//! expressions where `<op>` is one of:
//!
//! - `:` equality
//! - `>` greater-or-equal
//! - `<` less-or-equal
//!
//! Field and value must not contain any of the operator characters.

mod errors;
mod expression;
mod parser;

pub use errors::{FilterError, FilterResult};
pub use expression::{FilterExpression, FilterOperator};
pub use parser::{parse_expression, parse_list};
