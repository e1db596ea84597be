//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ClientError, PipelineError};

/// Map domain errors to a string for CLI output, preferring the server's own
/// `detail` message when one was sent.
pub fn map_error(e: &ClientError) -> String {
    match e {
        ClientError::PipelineError(inner @ PipelineError::Server { status, .. }) => {
            match inner.detail() {
                Some(detail) => format!("Server error ({}): {}", status, detail),
                None => e.to_string(),
            }
        }
        ClientError::PipelineError(PipelineError::RefreshFailed(_)) => {
            "Session expired. Please log in again.".to_string()
        }
        _ => e.to_string(),
    }
}
