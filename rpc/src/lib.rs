//! HTTP server for the LikeGate node.
//!
//! Provides endpoints for:
//! - Verification links (`GET /verify/{code}`)
//! - Like request submission from the chat front-end (`POST /requests`)
//! - Administrative VIP grants (`POST /admin/vip`)
//! - Health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer, RpcState};
