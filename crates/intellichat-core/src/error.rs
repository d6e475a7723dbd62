use reqwest::StatusCode;
use thiserror::Error;

/// Why a reply could not be obtained from the backend.
///
/// The variants exist for the diagnostic log only. The turn controller treats
/// every one of them the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(StatusCode),

    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("reply task failed: {0}")]
    TaskFailed(String),
}
