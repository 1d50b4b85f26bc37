//! Verification request record and its lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ChallengeCode, RequestId, RequesterId, Timestamp};

/// Where the result notification for a request is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub chat_id: i64,
    /// The command message the result replies to.
    pub message_id: i64,
}

/// Terminal outcome recorded when a request is marked processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessOutcome {
    /// Rejected by the cooldown rule; the user has to submit a new request.
    Deferred,
    /// The external action reported likes added.
    Succeeded,
    /// The external action ran but added nothing.
    NoEffect,
    /// The external action failed (timeout, network, malformed response).
    Failed,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessOutcome::Deferred => "deferred",
            ProcessOutcome::Succeeded => "succeeded",
            ProcessOutcome::NoEffect => "no_effect",
            ProcessOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gated like request, from challenge issuance to its terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: RequestId,
    pub requester_id: RequesterId,
    /// Game account UID the like is sent to.
    pub target_uid: String,
    pub region: String,
    pub challenge_code: ChallengeCode,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub verified: bool,
    pub verified_at: Option<Timestamp>,
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    pub outcome: Option<ProcessOutcome>,
    pub reply_target: ReplyTarget,
}

impl VerificationRequest {
    /// A fresh, unverified request.
    pub fn new(
        requester_id: RequesterId,
        target_uid: impl Into<String>,
        region: impl Into<String>,
        challenge_code: ChallengeCode,
        reply_target: ReplyTarget,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            requester_id,
            target_uid: target_uid.into(),
            region: region.into(),
            challenge_code,
            created_at,
            expires_at,
            verified: false,
            verified_at: None,
            processed: false,
            processed_at: None,
            outcome: None,
            reply_target,
        }
    }

    /// The challenge can no longer be verified at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Verification may still flip this request to verified.
    pub fn is_verifiable(&self, now: Timestamp) -> bool {
        !self.verified && !self.is_expired(now)
    }

    /// The dispatcher still owes this request a terminal decision.
    pub fn awaits_dispatch(&self) -> bool {
        self.verified && !self.processed
    }

    /// Apply the verified transition in place. Returns `false` if it was not allowed.
    pub fn apply_verified(&mut self, now: Timestamp) -> bool {
        if !self.is_verifiable(now) {
            return false;
        }
        self.verified = true;
        self.verified_at = Some(now);
        true
    }

    /// Apply the processed transition in place. Returns `false` if it was not allowed.
    pub fn apply_processed(&mut self, outcome: ProcessOutcome, now: Timestamp) -> bool {
        if !self.awaits_dispatch() {
            return false;
        }
        self.processed = true;
        self.processed_at = Some(now);
        self.outcome = Some(outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(created: u64, ttl: u64) -> VerificationRequest {
        VerificationRequest::new(
            RequesterId::new(7),
            "123456789",
            "ind",
            ChallengeCode::parse("AAAAAAAAAAAA").unwrap(),
            ReplyTarget {
                chat_id: 1,
                message_id: 2,
            },
            Timestamp::new(created),
            Timestamp::new(created + ttl),
        )
    }

    #[test]
    fn verified_transition_sets_timestamp_once() {
        let mut req = request(1_000, 600);
        assert!(req.apply_verified(Timestamp::new(1_100)));
        assert_eq!(req.verified_at, Some(Timestamp::new(1_100)));
        assert!(!req.apply_verified(Timestamp::new(1_200)));
        assert_eq!(req.verified_at, Some(Timestamp::new(1_100)));
    }

    #[test]
    fn expired_request_cannot_be_verified() {
        let mut req = request(1_000, 600);
        assert!(!req.apply_verified(Timestamp::new(1_600)));
        assert!(!req.verified);
        assert_eq!(req.verified_at, None);
    }

    #[test]
    fn processed_requires_verified_and_happens_once() {
        let mut req = request(1_000, 600);
        assert!(!req.apply_processed(ProcessOutcome::Succeeded, Timestamp::new(1_050)));
        req.apply_verified(Timestamp::new(1_100));
        assert!(req.apply_processed(ProcessOutcome::NoEffect, Timestamp::new(1_105)));
        assert!(!req.apply_processed(ProcessOutcome::Succeeded, Timestamp::new(1_110)));
        assert_eq!(req.outcome, Some(ProcessOutcome::NoEffect));
        assert!(!req.awaits_dispatch());
    }
}
