use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong between sending a query and getting a
/// usable payload back.
///
/// A backend that answers `{"success": false}` is not an error here; that is
/// an [`AnalysisResponse::Failure`](crate::analysis::AnalysisResponse).
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status code {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("malformed response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed response payload: missing `{0}`")]
    MissingField(&'static str),

    #[error("request task failed: {0}")]
    Task(String),

    #[error("request cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}
