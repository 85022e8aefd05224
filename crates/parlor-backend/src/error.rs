use thiserror::Error;

/// Errors produced by the backend contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The store rejected a write.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// A read or removal referenced a path that cannot exist.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Subscription bookkeeping failure.
    #[error("Listener error: {0}")]
    Listener(String),

    /// Object storage failure outside the upload observer flow.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Document (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;
