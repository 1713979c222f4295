//! # Filter Parser
//!
//! Splits filter lists on commas and each expression on the first
//! operator character.

use std::sync::OnceLock;

use regex::Regex;

use super::errors::{FilterError, FilterResult};
use super::expression::{FilterExpression, FilterOperator};

static OPERATOR: OnceLock<Regex> = OnceLock::new();
static LIST_SEPARATOR: OnceLock<Regex> = OnceLock::new();

fn operator_pattern() -> &'static Regex {
    OPERATOR.get_or_init(|| Regex::new(r"[:<>]").expect("operator pattern is valid"))
}

fn list_separator() -> &'static Regex {
    LIST_SEPARATOR.get_or_init(|| Regex::new(r"\s*,\s*").expect("separator pattern is valid"))
}

/// Parse a single `field<op>value` expression
pub fn parse_expression(expr: &str) -> FilterResult<FilterExpression> {
    let expr = expr.trim();

    let op_match = operator_pattern()
        .find(expr)
        .ok_or_else(|| FilterError::malformed(expr, "missing operator (one of ':', '>', '<')"))?;

    let field = expr[..op_match.start()].trim();
    let symbol = op_match.as_str();
    let value = expr[op_match.end()..].trim();

    if field.is_empty() {
        return Err(FilterError::malformed(expr, "missing field name"));
    }
    if value.is_empty() {
        return Err(FilterError::malformed(expr, "missing value"));
    }
    if operator_pattern().is_match(value) {
        return Err(FilterError::malformed(
            expr,
            "value must not contain ':', '>' or '<'",
        ));
    }

    let operator = FilterOperator::from_symbol(symbol)
        .ok_or_else(|| FilterError::malformed(expr, format!("unknown operator '{}'", symbol)))?;

    Ok(FilterExpression::new(field, operator, value))
}

/// Parse a comma-separated filter list.
///
/// `None` and blank input yield no expressions.
pub fn parse_list(list: Option<&str>) -> FilterResult<Vec<FilterExpression>> {
    let list = match list.map(str::trim) {
        None | Some("") => return Ok(Vec::new()),
        Some(list) => list,
    };

    list_separator()
        .split(list)
        .map(|part| {
            if part.is_empty() {
                Err(FilterError::malformed(list, "empty expression in list"))
            } else {
                parse_expression(part)
            }
        })
        .collect()
}
