//! Errors raised while constructing core types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid challenge code: {0}")]
    InvalidCode(String),

    #[error("random source unavailable: {0}")]
    Random(String),
}
