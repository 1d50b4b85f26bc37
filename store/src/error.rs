use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether retrying the same operation later may succeed.
    ///
    /// Only backend (availability) failures qualify; the rest describe the
    /// data itself and will fail again.
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}
