//! Verification gateway and challenge issuance.
//!
//! A request starts life in [`ChallengeIssuer::submit`], which stores it with
//! a fresh single-use code and hands back the link the user must open. Opening
//! the link lands in [`VerificationGateway::verify`], which flips the request
//! to verified through the store's compare-and-set. Nothing here calls the
//! external action; the dispatcher picks verified requests up later.

pub mod error;
pub mod gateway;
pub mod issuer;
pub mod link;
pub mod prompt;

pub use error::VerificationError;
pub use gateway::{VerificationGateway, VerifyOutcome};
pub use issuer::{
    ChallengeIssuer, IssuedChallenge, IssuerConfig, SubmitRequest, DEFAULT_CHALLENGE_TTL,
    MAX_CODE_ATTEMPTS,
};
pub use link::{DirectLinks, HttpShortener, LinkShortener};
