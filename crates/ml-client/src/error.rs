use thiserror::Error;

#[derive(Error, Debug)]
pub enum MLError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type MLResult<T> = Result<T, MLError>;

/// Map a non-success HTTP status to an error.
pub(crate) fn status_error(status: reqwest::StatusCode) -> MLError {
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        MLError::ModelNotLoaded
    } else if status == reqwest::StatusCode::GATEWAY_TIMEOUT || status == reqwest::StatusCode::REQUEST_TIMEOUT {
        MLError::Timeout
    } else {
        MLError::ServiceUnavailable(format!("Status: {}", status))
    }
}
