use thiserror::Error;

#[derive(Debug, Error)]
pub enum LikeApiError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("like API unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP request to like API failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from like API: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
