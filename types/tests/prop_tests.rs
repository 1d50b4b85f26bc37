use proptest::prelude::*;

use likegate_types::{
    ChallengeCode, ProcessOutcome, ReplyTarget, RequesterId, Timestamp, UserProfile,
    VerificationRequest,
};

fn request(created: u64, ttl: u64) -> VerificationRequest {
    VerificationRequest::new(
        RequesterId::new(1),
        "1000001",
        "ind",
        ChallengeCode::parse("Zz0Zz0Zz0Zz0").unwrap(),
        ReplyTarget {
            chat_id: -100,
            message_id: 5,
        },
        Timestamp::new(created),
        Timestamp::new(created + ttl),
    )
}

proptest! {
    /// Any 12-character alphanumeric string is a valid challenge code.
    #[test]
    fn alphanumeric_codes_parse(raw in "[A-Za-z0-9]{12}") {
        let code = ChallengeCode::parse(&raw).unwrap();
        prop_assert_eq!(code.as_str(), raw.as_str());
    }

    /// Codes of any other length are rejected.
    #[test]
    fn wrong_length_codes_rejected(raw in "[A-Za-z0-9]{0,11}|[A-Za-z0-9]{13,20}") {
        prop_assert!(ChallengeCode::parse(&raw).is_err());
    }

    /// The verified transition succeeds at most once, whatever the call times.
    #[test]
    fn verify_at_most_once(
        created in 0u64..1_000_000,
        ttl in 1u64..10_000,
        calls in prop::collection::vec(0u64..20_000, 1..8),
    ) {
        let mut req = request(created, ttl);
        let wins = calls
            .iter()
            .filter(|&&offset| req.apply_verified(Timestamp::new(created + offset)))
            .count();
        prop_assert!(wins <= 1);
        prop_assert_eq!(req.verified, req.verified_at.is_some());
    }

    /// The processed transition succeeds at most once and keeps the first outcome.
    #[test]
    fn process_at_most_once(attempts in 1usize..6) {
        let mut req = request(0, 600);
        req.apply_verified(Timestamp::new(10));
        let mut wins = 0;
        for i in 0..attempts {
            if req.apply_processed(ProcessOutcome::Failed, Timestamp::new(20 + i as u64)) {
                wins += 1;
            }
        }
        prop_assert_eq!(wins, 1);
        prop_assert_eq!(req.processed_at, Some(Timestamp::new(20)));
    }

    /// Bincode round-trip preserves every profile field.
    #[test]
    fn profile_bincode_roundtrip(
        id in any::<i64>(),
        vip in prop::option::of(any::<u64>()),
        last in prop::option::of(any::<u64>()),
    ) {
        let profile = UserProfile {
            requester_id: RequesterId::new(id),
            vip_expires: vip.map(Timestamp::new),
            last_used: last.map(Timestamp::new),
        };
        let bytes = bincode::serialize(&profile).unwrap();
        let back: UserProfile = bincode::deserialize(&bytes).unwrap();
        prop_assert_eq!(back, profile);
    }
}
