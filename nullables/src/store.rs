//! Nullable store: thread-safe in-memory storage for testing.
//!
//! Mirrors the compare-and-set semantics of the LMDB backend. All state sits
//! behind one mutex, so every operation is atomic just like an LMDB write
//! transaction.

use likegate_store::{ProfileStore, RequestStore, StoreError};
use likegate_types::{
    ChallengeCode, ProcessOutcome, ProfileUpdate, RequestId, RequesterId, Timestamp,
    UserProfile, VerificationRequest,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    requests: HashMap<RequestId, VerificationRequest>,
    codes: HashMap<ChallengeCode, RequestId>,
    profiles: HashMap<RequesterId, UserProfile>,
}

/// An in-memory request + profile store with fault injection.
pub struct NullStore {
    state: Mutex<State>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_profile_reads: AtomicBool,
    fail_profile_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_profile_reads: AtomicBool::new(false),
            fail_profile_writes: AtomicBool::new(false),
        }
    }

    /// Make every read return [`StoreError::Backend`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write return [`StoreError::Backend`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only `get_profile` fail.
    pub fn fail_profile_reads(&self, fail: bool) {
        self.fail_profile_reads.store(fail, Ordering::SeqCst);
    }

    /// Make only `upsert_profile` fail.
    pub fn fail_profile_writes(&self, fail: bool) {
        self.fail_profile_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored requests.
    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStore for NullStore {
    fn create(&self, request: &VerificationRequest) -> Result<(), StoreError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        if state.requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(format!("request {}", request.id)));
        }
        let holder = state
            .codes
            .get(&request.challenge_code)
            .and_then(|id| state.requests.get(id));
        if let Some(holder) = holder {
            if !holder.is_expired(request.created_at) {
                return Err(StoreError::Duplicate(format!(
                    "challenge code {}",
                    request.challenge_code
                )));
            }
        }
        state
            .codes
            .insert(request.challenge_code.clone(), request.id);
        state.requests.insert(request.id, request.clone());
        Ok(())
    }

    fn find_by_code(
        &self,
        code: &ChallengeCode,
    ) -> Result<Option<VerificationRequest>, StoreError> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .codes
            .get(code)
            .and_then(|id| state.requests.get(id))
            .cloned())
    }

    fn get(&self, id: &RequestId) -> Result<Option<VerificationRequest>, StoreError> {
        self.check_read()?;
        Ok(self.state.lock().unwrap().requests.get(id).cloned())
    }

    fn mark_verified(&self, code: &ChallengeCode, now: Timestamp) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let id = match state.codes.get(code) {
            Some(id) => *id,
            None => return Ok(false),
        };
        Ok(state
            .requests
            .get_mut(&id)
            .map(|request| request.apply_verified(now))
            .unwrap_or(false))
    }

    fn list_verified_unprocessed(&self) -> Result<Vec<VerificationRequest>, StoreError> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let mut pending: Vec<_> = state
            .requests
            .values()
            .filter(|r| r.awaits_dispatch())
            .cloned()
            .collect();
        pending.sort_by_key(|r| (r.verified_at, *r.id.as_bytes()));
        Ok(pending)
    }

    fn mark_processed(
        &self,
        id: &RequestId,
        outcome: ProcessOutcome,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let request = state
            .requests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("request {}", id)))?;
        Ok(request.apply_processed(outcome, now))
    }

    fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let stale: Vec<_> = state
            .requests
            .values()
            .filter(|r| !r.verified && r.is_expired(now))
            .map(|r| (r.id, r.challenge_code.clone()))
            .collect();
        for (id, code) in &stale {
            state.requests.remove(id);
            if state.codes.get(code) == Some(id) {
                state.codes.remove(code);
            }
        }
        Ok(stale.len() as u64)
    }
}

impl ProfileStore for NullStore {
    fn get_profile(&self, requester: RequesterId) -> Result<Option<UserProfile>, StoreError> {
        self.check_read()?;
        if self.fail_profile_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected profile read failure".into()));
        }
        Ok(self.state.lock().unwrap().profiles.get(&requester).cloned())
    }

    fn upsert_profile(
        &self,
        requester: RequesterId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, StoreError> {
        self.check_write()?;
        if self.fail_profile_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected profile write failure".into()));
        }
        let mut state = self.state.lock().unwrap();
        let profile = state
            .profiles
            .entry(requester)
            .or_insert_with(|| UserProfile::new(requester));
        profile.apply(update);
        Ok(profile.clone())
    }
}
