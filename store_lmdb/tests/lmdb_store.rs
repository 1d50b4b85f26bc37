//! Integration tests for the LMDB backend: persistence, compare-and-set
//! transitions, dispatch queue ordering, profiles and purging.

use std::sync::Arc;

use likegate_store::{MetaStore, ProfileStore, RequestStore, StoreError};
use likegate_store_lmdb::migration::CURRENT_SCHEMA_VERSION;
use likegate_store_lmdb::{check_integrity, LmdbStore};
use likegate_types::{
    ChallengeCode, ProcessOutcome, ProfileUpdate, ReplyTarget, RequesterId, Timestamp,
    VerificationRequest,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TTL: u64 = 600;

fn temp_store() -> (tempfile::TempDir, LmdbStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).expect("open store");
    (dir, store)
}

fn code(raw: &str) -> ChallengeCode {
    ChallengeCode::parse(raw).expect("valid code")
}

fn request(requester: i64, raw_code: &str, created: u64) -> VerificationRequest {
    VerificationRequest::new(
        RequesterId::new(requester),
        "4000000001",
        "ind",
        code(raw_code),
        ReplyTarget {
            chat_id: -1001,
            message_id: 77,
        },
        Timestamp::new(created),
        Timestamp::new(created + TTL),
    )
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[test]
fn fresh_store_is_migrated_and_healthy() {
    let (_dir, store) = temp_store();
    assert_eq!(store.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    let report = check_integrity(&store).unwrap();
    assert!(report.is_healthy(), "errors: {:?}", report.errors);
    assert_eq!(report.databases_checked, 5);
}

#[test]
fn indexes_stay_consistent_through_the_lifecycle() {
    let (_dir, store) = temp_store();
    let settled = request(1, "AAAAAAAAAAAA", 1_000);
    let pending = request(2, "BBBBBBBBBBBB", 1_000);
    store.create(&settled).unwrap();
    store.create(&pending).unwrap();
    store.mark_verified(&settled.challenge_code, Timestamp::new(1_001)).unwrap();
    store.mark_verified(&pending.challenge_code, Timestamp::new(1_002)).unwrap();
    store
        .mark_processed(&settled.id, ProcessOutcome::Succeeded, Timestamp::new(1_003))
        .unwrap();

    let report = check_integrity(&store).unwrap();
    assert!(report.is_healthy(), "errors: {:?}", report.errors);
    // schema version + 2 requests + 2 codes + 1 queue entry
    assert_eq!(report.total_entries, 6);
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    {
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        store.create(&req).unwrap();
        assert!(store.mark_verified(&req.challenge_code, Timestamp::new(1_010)).unwrap());
    }
    let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
    let loaded = store.get(&req.id).unwrap().expect("persisted");
    assert!(loaded.verified);
    assert_eq!(store.list_verified_unprocessed().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Create / lookup
// ---------------------------------------------------------------------------

#[test]
fn create_then_find_by_code() {
    let (_dir, store) = temp_store();
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&req).unwrap();

    let found = store.find_by_code(&req.challenge_code).unwrap().expect("found");
    assert_eq!(found, req);
    assert!(store.find_by_code(&code("BBBBBBBBBBBB")).unwrap().is_none());
}

#[test]
fn duplicate_live_code_is_rejected() {
    let (_dir, store) = temp_store();
    store.create(&request(1, "AAAAAAAAAAAA", 1_000)).unwrap();
    let err = store.create(&request(2, "AAAAAAAAAAAA", 1_100)).unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[test]
fn expired_code_can_be_reissued() {
    let (_dir, store) = temp_store();
    let old = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&old).unwrap();
    let new = request(2, "AAAAAAAAAAAA", 1_000 + TTL);
    store.create(&new).unwrap();

    let holder = store.find_by_code(&new.challenge_code).unwrap().unwrap();
    assert_eq!(holder.id, new.id);
}

// ---------------------------------------------------------------------------
// mark_verified
// ---------------------------------------------------------------------------

#[test]
fn mark_verified_succeeds_once() {
    let (_dir, store) = temp_store();
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&req).unwrap();

    assert!(store.mark_verified(&req.challenge_code, Timestamp::new(1_100)).unwrap());
    assert!(!store.mark_verified(&req.challenge_code, Timestamp::new(1_101)).unwrap());

    let loaded = store.get(&req.id).unwrap().unwrap();
    assert_eq!(loaded.verified_at, Some(Timestamp::new(1_100)));
}

#[test]
fn mark_verified_after_expiry_leaves_store_untouched() {
    let (_dir, store) = temp_store();
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&req).unwrap();

    assert!(!store
        .mark_verified(&req.challenge_code, Timestamp::new(1_000 + TTL))
        .unwrap());
    assert_eq!(store.get(&req.id).unwrap().unwrap(), req);
    assert!(store.list_verified_unprocessed().unwrap().is_empty());
}

#[test]
fn mark_verified_unknown_code_is_false() {
    let (_dir, store) = temp_store();
    assert!(!store
        .mark_verified(&code("ZZZZZZZZZZZZ"), Timestamp::new(5))
        .unwrap());
}

#[test]
fn concurrent_mark_verified_has_one_winner() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&req).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let code = req.challenge_code.clone();
            std::thread::spawn(move || {
                store
                    .mark_verified(&code, Timestamp::new(1_100 + i))
                    .unwrap()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
}

// ---------------------------------------------------------------------------
// Dispatch queue / mark_processed
// ---------------------------------------------------------------------------

#[test]
fn dispatch_queue_is_in_verification_order() {
    let (_dir, store) = temp_store();
    let first = request(1, "AAAAAAAAAAAA", 1_000);
    let second = request(2, "BBBBBBBBBBBB", 1_000);
    let unverified = request(3, "CCCCCCCCCCCC", 1_000);
    for r in [&first, &second, &unverified] {
        store.create(r).unwrap();
    }
    store.mark_verified(&second.challenge_code, Timestamp::new(1_050)).unwrap();
    store.mark_verified(&first.challenge_code, Timestamp::new(1_060)).unwrap();

    let pending: Vec<_> = store
        .list_verified_unprocessed()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(pending, vec![second.id, first.id]);
}

#[test]
fn mark_processed_is_compare_and_set() {
    let (_dir, store) = temp_store();
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&req).unwrap();

    // Not verified yet: the transition is refused.
    assert!(!store
        .mark_processed(&req.id, ProcessOutcome::Succeeded, Timestamp::new(1_001))
        .unwrap());

    store.mark_verified(&req.challenge_code, Timestamp::new(1_010)).unwrap();
    assert!(store
        .mark_processed(&req.id, ProcessOutcome::NoEffect, Timestamp::new(1_020))
        .unwrap());
    assert!(!store
        .mark_processed(&req.id, ProcessOutcome::Succeeded, Timestamp::new(1_030))
        .unwrap());

    let loaded = store.get(&req.id).unwrap().unwrap();
    assert!(loaded.processed);
    assert_eq!(loaded.outcome, Some(ProcessOutcome::NoEffect));
    assert_eq!(loaded.processed_at, Some(Timestamp::new(1_020)));
    assert!(store.list_verified_unprocessed().unwrap().is_empty());
}

#[test]
fn mark_processed_unknown_id_is_not_found() {
    let (_dir, store) = temp_store();
    let req = request(1, "AAAAAAAAAAAA", 1_000);
    let err = store
        .mark_processed(&req.id, ProcessOutcome::Failed, Timestamp::new(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

#[test]
fn purge_removes_only_expired_unverified() {
    let (_dir, store) = temp_store();
    let expired = request(1, "AAAAAAAAAAAA", 1_000);
    let verified = request(2, "BBBBBBBBBBBB", 1_000);
    let live = request(3, "CCCCCCCCCCCC", 1_500);
    for r in [&expired, &verified, &live] {
        store.create(r).unwrap();
    }
    store.mark_verified(&verified.challenge_code, Timestamp::new(1_100)).unwrap();

    let removed = store.purge_expired(Timestamp::new(1_000 + TTL + 1)).unwrap();
    assert_eq!(removed, 1);
    assert!(store.get(&expired.id).unwrap().is_none());
    assert!(store.find_by_code(&expired.challenge_code).unwrap().is_none());
    assert!(store.get(&verified.id).unwrap().is_some());
    assert!(store.get(&live.id).unwrap().is_some());
}

#[test]
fn purge_keeps_code_reassigned_to_newer_request() {
    let (_dir, store) = temp_store();
    let old = request(1, "AAAAAAAAAAAA", 1_000);
    store.create(&old).unwrap();
    let new = request(2, "AAAAAAAAAAAA", 2_000);
    store.create(&new).unwrap();

    assert_eq!(store.purge_expired(Timestamp::new(2_001)).unwrap(), 1);
    let holder = store.find_by_code(&new.challenge_code).unwrap().unwrap();
    assert_eq!(holder.id, new.id);
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[test]
fn profile_upsert_creates_and_merges() {
    let (_dir, store) = temp_store();
    let who = RequesterId::new(42);
    assert!(store.get_profile(who).unwrap().is_none());

    store
        .upsert_profile(who, &ProfileUpdate::vip_until(Timestamp::new(9_000)))
        .unwrap();
    let written = store
        .upsert_profile(who, &ProfileUpdate::last_used(Timestamp::new(1_234)))
        .unwrap();

    assert_eq!(written.vip_expires, Some(Timestamp::new(9_000)));
    assert_eq!(written.last_used, Some(Timestamp::new(1_234)));
    assert_eq!(store.get_profile(who).unwrap(), Some(written));
}
