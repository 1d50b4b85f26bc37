//! Axum-based HTTP server.

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use prometheus::{IntCounterVec, Registry};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use likegate_policy::VipGrants;
use likegate_types::RequesterId;
use likegate_verification::{ChallengeIssuer, VerificationGateway};

use crate::error::RpcError;
use crate::handlers;

/// Everything the handlers need, shared across requests.
pub struct RpcState {
    pub gateway: Arc<VerificationGateway>,
    pub issuer: Arc<ChallengeIssuer>,
    pub vip: Arc<VipGrants>,
    /// Operators allowed to call `/admin/vip`.
    pub admin_ids: HashSet<RequesterId>,
    /// Exposed at `/metrics` when set.
    pub metrics_registry: Option<Registry>,
    /// `/verify` outcomes, labelled `outcome`.
    pub verifications: Option<IntCounterVec>,
}

/// Build the router with all endpoints.
pub fn router(state: Arc<RpcState>) -> Router {
    Router::new()
        .route("/verify/:code", get(handlers::verify))
        .route("/requests", post(handlers::submit_request))
        .route("/admin/vip", post(handlers::grant_vip))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct RpcServer {
    listener: TcpListener,
    state: Arc<RpcState>,
}

impl RpcServer {
    /// Bind the listening socket. Serving starts with [`serve`](Self::serve).
    pub async fn bind(addr: SocketAddr, state: Arc<RpcState>) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        self.listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "RPC server listening");
        }
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
