//! Error types for the Foodsnap client persistence and resilience layer.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt record under key '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Request pipeline errors.
///
/// Payloads are plain strings so a refresh outcome can be shared between
/// concurrent waiters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Credential expired: {0}")]
    Unauthorized(String),

    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server responded with status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    /// Whether the server rejected the credential
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PipelineError::Unauthorized(_))
    }

    /// Whether the session was lost because the refresh cycle failed
    pub fn is_session_lost(&self) -> bool {
        matches!(self, PipelineError::RefreshFailed(_))
    }

    /// Server-provided `detail` message, when the error body carries one
    pub fn detail(&self) -> Option<String> {
        let body = match self {
            PipelineError::Server { body, .. } | PipelineError::Unauthorized(body) => body,
            _ => return None,
        };
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
    }
}

/// Crate-level errors surfaced to callers of the higher-level services
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Request failed: {0}")]
    PipelineError(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image processing failed: {0}")]
    ImageError(String),

    #[error("No cached image available")]
    NothingCached,
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::ConfigError(err.to_string())
    }
}

impl From<image::ImageError> for ClientError {
    fn from(err: image::ImageError) -> Self {
        ClientError::ImageError(err.to_string())
    }
}
