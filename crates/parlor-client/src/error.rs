use thiserror::Error;

use parlor_backend::BackendError;

/// Errors surfaced to the user interface.
///
/// None of these is fatal: every failure degrades to a visible,
/// recoverable state. Components accumulate them in a list rather than
/// replacing one another; a successful send clears the list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Input rejected before any backend call.
    #[error("{0}")]
    Validation(String),

    /// A message or star write was rejected by the store.
    #[error("Write failed: {0}")]
    Write(#[from] BackendError),

    /// Attachment transfer or URL resolution failed.
    #[error("Upload failed: {0}")]
    Upload(String),
}

impl ClientError {
    /// The empty-draft validation error.
    pub fn message_required() -> Self {
        Self::Validation("message required".to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
