//! Remote call errors.

use thiserror::Error;

/// HTTP status the resource manager returns for absent resources.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Error returned by a remote resource-manager call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status {status}: {message}")]
pub struct RemoteError {
    /// HTTP status code of the failed call.
    pub status: u16,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(STATUS_NOT_FOUND, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }
}

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
