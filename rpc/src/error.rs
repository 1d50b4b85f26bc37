//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use likegate_policy::PolicyError;
use likegate_verification::VerificationError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("operator {0} is not allowed to do this")]
    Forbidden(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Forbidden(_) => StatusCode::FORBIDDEN,
            RpcError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<VerificationError> for RpcError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Validation(msg) => RpcError::InvalidRequest(msg),
            VerificationError::Store(e) => RpcError::Unavailable(e.to_string()),
            VerificationError::CodeGeneration(msg) => RpcError::Server(msg),
        }
    }
}

impl From<PolicyError> for RpcError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::Validation(msg) => RpcError::InvalidRequest(msg),
            PolicyError::Store(e) => RpcError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
