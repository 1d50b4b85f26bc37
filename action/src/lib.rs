//! Action invoker: the adapter around the external like-granting API.
//!
//! The external call has a real side effect (likes are sent), so callers
//! must invoke it at most once per request. This crate only guarantees that
//! every invocation is bounded by a timeout and that whatever happens is
//! folded into a typed [`ActionOutcome`].

pub mod api;
pub mod error;
pub mod http;
pub mod invoker;

pub use api::{LikeApi, LikeReport};
pub use error::LikeApiError;
pub use http::{HttpLikeApi, UID_PLACEHOLDER};
pub use invoker::{ActionInvoker, ActionOutcome, DEFAULT_ACTION_TIMEOUT};
