//! LikeGate node: the dispatcher loop and the service that runs it.
//!
//! The node is the central coordinator that:
//! - Opens and checks the LMDB store
//! - Serves verification links and commands over HTTP
//! - Polls verified requests and settles each one at most once
//! - Reports results back to the requester
//! - Exposes Prometheus metrics

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod node;
pub mod shutdown;

pub use config::NodeConfig;
pub use dispatcher::{
    CycleReport, Dispatcher, DispatcherConfig, DEFAULT_POLL_INTERVAL, DEFAULT_PURGE_INTERVAL,
};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::DispatchMetrics;
pub use node::{LikeGateNode, Ports};
pub use shutdown::ShutdownController;
