//! Shared utilities for LikeGate.

pub mod markdown;
pub mod time;

pub use markdown::escape_markdown;
pub use time::{format_hours_minutes, format_utc};
