//! # Overlap Errors
//!
//! Every failure surfaced to a caller of the overlap join. Backend
//! transport errors are mapped into this taxonomy where they occur and
//! never reach the client raw.

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::filter::FilterError;

/// Result type for overlap requests
pub type OverlapResult<T> = Result<T, OverlapError>;

/// Which kind of paginated stream a cursor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// Top-level driver query
    Driver,
    /// One secondary caller's join query
    Sub,
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorKind::Driver => write!(f, "driver"),
            CursorKind::Sub => write!(f, "sub"),
        }
    }
}

/// Overlap request errors
#[derive(Debug, Clone, Error)]
pub enum OverlapError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// A filter list could not be parsed
    #[error("Invalid filter in '{param}': {source}")]
    MalformedFilter {
        param: String,
        #[source]
        source: FilterError,
    },

    /// No caller list was supplied
    #[error("Caller list is missing or empty")]
    MissingCallers,

    /// A parameter value is unusable
    #[error("Invalid parameter '{param}': {reason}")]
    InvalidParam { param: String, reason: String },

    /// Cursor is unknown to the backend or has expired
    #[error("The {kind} scroll id is unknown or has expired: {cursor}")]
    CursorExpired { kind: CursorKind, cursor: String },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// The backend failed to run a query
    #[error("Backend query failed: {0}")]
    BackendQuery(String),

    /// The request exceeded its deadline
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl OverlapError {
    pub fn malformed_filter(param: impl Into<String>, source: FilterError) -> Self {
        OverlapError::MalformedFilter {
            param: param.into(),
            source,
        }
    }

    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        OverlapError::InvalidParam {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            OverlapError::MalformedFilter { .. } => StatusCode::BAD_REQUEST,
            OverlapError::MissingCallers => StatusCode::BAD_REQUEST,
            OverlapError::InvalidParam { .. } => StatusCode::BAD_REQUEST,
            OverlapError::CursorExpired { .. } => StatusCode::NOT_FOUND,
            OverlapError::BackendQuery(_) => StatusCode::BAD_GATEWAY,
            OverlapError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            OverlapError::MalformedFilter { .. } => "MALFORMED_FILTER",
            OverlapError::MissingCallers => "MISSING_CALLERS",
            OverlapError::InvalidParam { .. } => "INVALID_PARAM",
            OverlapError::CursorExpired { .. } => "CURSOR_EXPIRED",
            OverlapError::BackendQuery(_) => "BACKEND_QUERY_FAILED",
            OverlapError::Timeout(_) => "TIMEOUT",
        }
    }

    /// True for errors caused by the request itself
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
}

impl From<&OverlapError> for ErrorResponse {
    fn from(err: &OverlapError) -> Self {
        Self {
            error: err.to_string(),
            code: err.status_code().as_u16(),
            kind: err.code(),
        }
    }
}

impl IntoResponse for OverlapError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}
