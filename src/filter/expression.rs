//! # Filter Expression AST

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Exact match, written `:`
    #[serde(rename = "eq")]
    Equals,

    /// Inclusive lower bound, written `>`
    #[serde(rename = "gte")]
    GreaterOrEqual,

    /// Inclusive upper bound, written `<`
    #[serde(rename = "lte")]
    LessOrEqual,
}

impl FilterOperator {
    /// Map an operator symbol to its operator
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ":" => Some(FilterOperator::Equals),
            ">" => Some(FilterOperator::GreaterOrEqual),
            "<" => Some(FilterOperator::LessOrEqual),
            _ => None,
        }
    }

    /// The symbol used in the filter language
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Equals => ":",
            FilterOperator::GreaterOrEqual => ">",
            FilterOperator::LessOrEqual => "<",
        }
    }

    pub fn is_range(&self) -> bool {
        !matches!(self, FilterOperator::Equals)
    }
}

/// A single parsed predicate: `field`, `operator`, `value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterExpression {
    field: String,
    operator: FilterOperator,
    value: String,
}

impl FilterExpression {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Equals, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::GreaterOrEqual, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::LessOrEqual, value)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.operator.symbol(), self.value)
    }
}
