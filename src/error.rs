//! Error types for key/value store operations.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, KvError>;

/// Errors that can occur while operating on the key/value store.
#[derive(Error, Debug)]
pub enum KvError {
    /// Path, mount, or version does not exist, or holds no live value.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Operation has no meaning for the generation governing the target mount.
    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    /// Failure reported by the underlying transport (network, auth,
    /// malformed response). Propagated verbatim; this layer never retries.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KvError {
    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported { message: message.into() }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Check whether this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check whether this error means the operation is not available on the
    /// resolved backend generation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
