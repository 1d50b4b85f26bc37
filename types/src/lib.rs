//! Fundamental types for LikeGate.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! request and profile records, identifiers, challenge codes, timestamps and the clock.

pub mod code;
pub mod error;
pub mod ids;
pub mod profile;
pub mod request;
pub mod time;

pub use code::{ChallengeCode, CodeSource, OsCodeSource, CHALLENGE_CODE_LEN};
pub use error::TypeError;
pub use ids::{RequestId, RequesterId};
pub use profile::{ProfileUpdate, UserProfile};
pub use request::{ProcessOutcome, ReplyTarget, VerificationRequest};
pub use time::{Clock, SystemClock, Timestamp};
