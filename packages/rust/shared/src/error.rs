//! Error types for DocBridge.
//!
//! Library crates use [`DocBridgeError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all DocBridge operations.
#[derive(Debug, thiserror::Error)]
pub enum DocBridgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The referenced connection does not exist in the store.
    #[error("connection not found: {id}")]
    ConnectionNotFound { id: String },

    /// The connection exists but is not in the `active` state.
    #[error("connection {id} is not active (status: {status})")]
    ConnectionInactive { id: String, status: String },

    /// The registry has no provider under the requested name.
    #[error("provider not found: {name}")]
    ProviderNotFound { name: String },

    /// The provider's operation catalog has no match for a required category.
    #[error("provider {provider} does not support {operation}")]
    NotSupported { provider: String, operation: String },

    /// The provider executed an operation and reported failure.
    #[error("{provider} operation failed: {message}")]
    Operation { provider: String, message: String },

    /// Payload decoding error (base64 content, malformed response body).
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocBridgeError>;

impl DocBridgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a connection-not-found error for the given id.
    pub fn connection_not_found(id: impl Into<String>) -> Self {
        Self::ConnectionNotFound { id: id.into() }
    }

    /// Create a not-supported error for a provider/operation-category pair.
    pub fn not_supported(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotSupported {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// Create an operation-failure error carrying the provider's message.
    pub fn operation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
