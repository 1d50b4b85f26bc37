//! Verification request storage trait.

use crate::StoreError;
use likegate_types::{ChallengeCode, ProcessOutcome, RequestId, Timestamp, VerificationRequest};

/// Durable record of each request and its lifecycle state.
pub trait RequestStore: Send + Sync {
    /// Persist a new request.
    ///
    /// Fails with [`StoreError::Duplicate`] if another request that has not
    /// yet expired (as of `request.created_at`) holds the same challenge code.
    fn create(&self, request: &VerificationRequest) -> Result<(), StoreError>;

    /// Look up the request currently holding `code`.
    fn find_by_code(&self, code: &ChallengeCode)
        -> Result<Option<VerificationRequest>, StoreError>;

    fn get(&self, id: &RequestId) -> Result<Option<VerificationRequest>, StoreError>;

    /// Set `verified = true, verified_at = now` iff the request exists, is
    /// unverified and is unexpired at `now`. Returns whether this call won.
    fn mark_verified(&self, code: &ChallengeCode, now: Timestamp) -> Result<bool, StoreError>;

    /// All requests with `verified = true, processed = false`, oldest verification first.
    fn list_verified_unprocessed(&self) -> Result<Vec<VerificationRequest>, StoreError>;

    /// Set `processed = true` with the terminal outcome iff the request is
    /// verified and not yet processed. Returns whether this call won.
    fn mark_processed(
        &self,
        id: &RequestId,
        outcome: ProcessOutcome,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Delete requests that were never verified and expired before `now`.
    /// Returns the number removed.
    fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError>;
}
