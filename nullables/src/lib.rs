//! Nullable infrastructure for deterministic testing.
//!
//! Every outside dependency of the pipeline (clock, storage, the like API,
//! the notifier, code generation) sits behind a trait. This crate provides
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (including injected failures)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod codes;
pub mod like_api;
pub mod notifier;
pub mod store;

pub use clock::NullClock;
pub use codes::NullCodeSource;
pub use like_api::NullLikeApi;
pub use notifier::{NullNotifier, SentMessage};
pub use store::NullStore;
