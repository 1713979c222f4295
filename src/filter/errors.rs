//! Filter parsing errors

use thiserror::Error;

/// Result type for filter parsing
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors raised while parsing a filter expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Expression does not split into field, operator and value
    #[error("Malformed filter '{expression}': {reason}")]
    Malformed { expression: String, reason: String },
}

impl FilterError {
    pub fn malformed(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::Malformed {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// The offending expression text
    pub fn expression(&self) -> &str {
        match self {
            FilterError::Malformed { expression, .. } => expression,
        }
    }
}
