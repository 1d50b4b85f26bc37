use likegate_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    /// Malformed input; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No unused challenge code could be produced.
    #[error("challenge code generation failed: {0}")]
    CodeGeneration(String),
}

impl VerificationError {
    pub fn is_validation(&self) -> bool {
        matches!(self, VerificationError::Validation(_))
    }
}
