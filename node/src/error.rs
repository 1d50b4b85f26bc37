use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] likegate_store::StoreError),

    #[error("database error: {0}")]
    Lmdb(#[from] likegate_store_lmdb::LmdbError),

    #[error("policy error: {0}")]
    Policy(#[from] likegate_policy::PolicyError),

    #[error("like API error: {0}")]
    LikeApi(#[from] likegate_action::LikeApiError),

    #[error("notifier error: {0}")]
    Notify(#[from] likegate_notify::NotifyError),

    #[error("config error: {0}")]
    Config(String),

    #[error("database integrity check failed: {0}")]
    Integrity(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPC server error: {0}")]
    Rpc(String),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
