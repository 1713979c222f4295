//! Search backend errors

use thiserror::Error;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a search backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Scroll context is unknown or has expired
    #[error("Scroll context not found or expired: {0}")]
    CursorNotFound(String),

    /// Target index does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response could not be decoded
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Fixture documents could not be loaded
    #[error("Fixture error: {0}")]
    Fixtures(String),
}

impl BackendError {
    pub fn is_cursor_not_found(&self) -> bool {
        matches!(self, BackendError::CursorNotFound(_))
    }
}
