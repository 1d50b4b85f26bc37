//! HTTP request handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};

use likegate_types::{ReplyTarget, RequesterId};
use likegate_utils::format_utc;
use likegate_verification::{SubmitRequest, VerificationError, VerifyOutcome};

use crate::error::RpcError;
use crate::server::RpcState;

pub const VERIFIED_TEXT: &str = "✅ Verification successful. Bot will now process your like.";
pub const ALREADY_VERIFIED_TEXT: &str =
    "✅ Already verified. Your like request is already being processed.";
pub const LINK_UNUSABLE_TEXT: &str = "❌ Link expired or already used.";
pub const MALFORMED_LINK_TEXT: &str = "❌ Invalid verification link.";
pub const UNAVAILABLE_TEXT: &str = "⚠️ Service temporarily unavailable, please try again.";

// ── Verification ────────────────────────────────────────────────────────

pub async fn verify(State(state): State<Arc<RpcState>>, Path(code): Path<String>) -> Response {
    let (status, text, label) = match state.gateway.verify(&code) {
        Ok(VerifyOutcome::Verified) => (StatusCode::OK, VERIFIED_TEXT, "verified"),
        Ok(VerifyOutcome::AlreadyVerified) => {
            (StatusCode::OK, ALREADY_VERIFIED_TEXT, "already_verified")
        }
        Ok(VerifyOutcome::Expired) => (StatusCode::GONE, LINK_UNUSABLE_TEXT, "expired"),
        Ok(VerifyOutcome::Unknown) => (StatusCode::NOT_FOUND, LINK_UNUSABLE_TEXT, "unknown"),
        Err(VerificationError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, MALFORMED_LINK_TEXT, "malformed")
        }
        Err(e) => {
            tracing::warn!(error = %e, "verification failed");
            (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_TEXT, "error")
        }
    };
    if let Some(counter) = &state.verifications {
        counter.with_label_values(&[label]).inc();
    }
    (status, text).into_response()
}

// ── Request submission ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub requester_id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    pub region: String,
    pub target_uid: String,
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRequestResponse {
    pub request_id: String,
    pub link: String,
    pub expires_at: u64,
    pub expires_at_utc: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_verify_url: Option<String>,
}

pub async fn submit_request(
    State(state): State<Arc<RpcState>>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<CreateRequestResponse>), RpcError> {
    let issued = state
        .issuer
        .submit(SubmitRequest {
            requester_id: RequesterId::new(body.requester_id),
            display_name: body.display_name,
            region: body.region,
            target_uid: body.target_uid,
            reply_target: ReplyTarget {
                chat_id: body.chat_id,
                message_id: body.message_id,
            },
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRequestResponse {
            request_id: issued.request_id.to_string(),
            link: issued.link,
            expires_at: issued.expires_at.as_secs(),
            expires_at_utc: format_utc(issued.expires_at),
            prompt: issued.prompt,
            how_to_verify_url: issued.how_to_verify_url,
        }),
    ))
}

// ── VIP ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GrantVipBody {
    pub operator_id: i64,
    pub target_id: i64,
    pub days: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GrantVipResponse {
    pub target_id: i64,
    pub vip_expires: u64,
    pub vip_expires_utc: String,
    /// Confirmation text for the operator (Markdown).
    pub message: String,
}

pub async fn grant_vip(
    State(state): State<Arc<RpcState>>,
    Json(body): Json<GrantVipBody>,
) -> Result<Json<GrantVipResponse>, RpcError> {
    let operator = RequesterId::new(body.operator_id);
    if !state.admin_ids.contains(&operator) {
        tracing::warn!(operator_id = body.operator_id, "unauthorized VIP grant attempt");
        return Err(RpcError::Forbidden(operator.to_string()));
    }

    let grant = state
        .vip
        .grant(RequesterId::new(body.target_id), body.days)?;
    let until = format_utc(grant.vip_expires);
    Ok(Json(GrantVipResponse {
        target_id: body.target_id,
        vip_expires: grant.vip_expires.as_secs(),
        message: format!(
            "✅ VIP access granted to user `{}` for {} days (until {})",
            body.target_id, body.days, until
        ),
        vip_expires_utc: until,
    }))
}

// ── Operations ──────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Response {
    let Some(registry) = &state.metrics_registry else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buf) {
        return RpcError::Server(e.to_string()).into_response();
    }
    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buf,
    )
        .into_response()
}
