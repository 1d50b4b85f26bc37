use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] likegate_store::StoreError),
}
