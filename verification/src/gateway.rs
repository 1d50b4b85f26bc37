//! The `/verify/{code}` decision.

use std::sync::Arc;

use likegate_store::RequestStore;
use likegate_types::{ChallengeCode, Clock};

use crate::VerificationError;

/// Result of presenting a challenge code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// This call flipped the request to verified.
    Verified,
    /// The code was already used; nothing downstream runs again.
    AlreadyVerified,
    /// The code exists but its TTL has elapsed. The request is left as is.
    Expired,
    /// No request holds this code.
    Unknown,
}

impl VerifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyOutcome::Verified => "verified",
            VerifyOutcome::AlreadyVerified => "already_verified",
            VerifyOutcome::Expired => "expired",
            VerifyOutcome::Unknown => "unknown",
        }
    }
}

/// Marks requests verified when their challenge link is opened.
pub struct VerificationGateway {
    store: Arc<dyn RequestStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationGateway {
    pub fn new(store: Arc<dyn RequestStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Verify the request holding `raw_code`.
    ///
    /// The transition itself is the store's compare-and-set, so among
    /// concurrent callers presenting the same code exactly one sees
    /// [`VerifyOutcome::Verified`]. The losers are classified afterwards from
    /// the stored record.
    pub fn verify(&self, raw_code: &str) -> Result<VerifyOutcome, VerificationError> {
        let code = ChallengeCode::parse(raw_code)
            .map_err(|e| VerificationError::Validation(e.to_string()))?;
        let now = self.clock.now();

        if self.store.mark_verified(&code, now)? {
            tracing::info!(code = %code, "request verified");
            return Ok(VerifyOutcome::Verified);
        }

        let outcome = match self.store.find_by_code(&code)? {
            None => VerifyOutcome::Unknown,
            Some(request) if request.verified => VerifyOutcome::AlreadyVerified,
            // Unverified and refused by the CAS: only expiry can do that.
            Some(_) => VerifyOutcome::Expired,
        };
        tracing::debug!(code = %code, outcome = outcome.as_str(), "verification refused");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use likegate_nullables::{NullClock, NullStore};
    use likegate_types::{ReplyTarget, RequesterId, Timestamp, VerificationRequest};

    const T0: u64 = 1_700_000_000;
    const TTL: u64 = 600;

    fn setup() -> (Arc<NullStore>, Arc<NullClock>, VerificationGateway, VerificationRequest) {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(T0));
        let request = VerificationRequest::new(
            RequesterId::new(5),
            "123456789",
            "ind",
            ChallengeCode::parse("Abc123Def456").unwrap(),
            ReplyTarget {
                chat_id: 10,
                message_id: 20,
            },
            Timestamp::new(T0),
            Timestamp::new(T0 + TTL),
        );
        store.create(&request).unwrap();
        let gateway = VerificationGateway::new(store.clone(), clock.clone());
        (store, clock, gateway, request)
    }

    #[test]
    fn first_visit_verifies() {
        let (store, clock, gateway, request) = setup();
        clock.advance(60);
        assert_eq!(gateway.verify("Abc123Def456").unwrap(), VerifyOutcome::Verified);

        let stored = store.get(&request.id).unwrap().unwrap();
        assert!(stored.verified);
        assert_eq!(stored.verified_at, Some(Timestamp::new(T0 + 60)));
    }

    #[test]
    fn second_visit_is_already_verified() {
        let (store, clock, gateway, request) = setup();
        gateway.verify("Abc123Def456").unwrap();
        clock.advance(30);
        assert_eq!(
            gateway.verify("Abc123Def456").unwrap(),
            VerifyOutcome::AlreadyVerified
        );
        let stored = store.get(&request.id).unwrap().unwrap();
        assert_eq!(stored.verified_at, Some(Timestamp::new(T0)));
    }

    #[test]
    fn expired_code_leaves_store_unchanged() {
        let (store, clock, gateway, request) = setup();
        clock.advance(TTL);
        assert_eq!(gateway.verify("Abc123Def456").unwrap(), VerifyOutcome::Expired);
        assert_eq!(store.get(&request.id).unwrap().unwrap(), request);
    }

    #[test]
    fn unknown_code() {
        let (_store, _clock, gateway, _request) = setup();
        assert_eq!(gateway.verify("ZZZZZZZZZZZZ").unwrap(), VerifyOutcome::Unknown);
    }

    #[test]
    fn malformed_code_is_validation_error() {
        let (store, _clock, gateway, request) = setup();
        for bad in ["", "short", "Abc123Def45!", "Abc123Def4567"] {
            assert!(gateway.verify(bad).unwrap_err().is_validation(), "{bad}");
        }
        assert!(!store.get(&request.id).unwrap().unwrap().verified);
    }

    #[test]
    fn store_failure_propagates() {
        let (store, _clock, gateway, _request) = setup();
        store.fail_writes(true);
        assert!(matches!(
            gateway.verify("Abc123Def456"),
            Err(VerificationError::Store(_))
        ));
    }

    #[test]
    fn concurrent_visits_have_one_winner() {
        let (_store, _clock, gateway, _request) = setup();
        let gateway = Arc::new(gateway);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gateway = Arc::clone(&gateway);
                std::thread::spawn(move || gateway.verify("Abc123Def456").unwrap())
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == VerifyOutcome::Verified)
                .count(),
            1
        );
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, VerifyOutcome::Verified | VerifyOutcome::AlreadyVerified)));
    }
}
