//! LMDB implementation of RequestStore.
//!
//! The compare-and-set transitions read the current record, check the
//! transition guard on [`VerificationRequest`] and write back, all inside a
//! single write transaction. A guard that fails simply drops the
//! transaction (which aborts it) and reports `false`.

use heed::types::Bytes;
use heed::{Database, RoTxn};

use likegate_store::request::RequestStore;
use likegate_store::StoreError;
use likegate_types::{ChallengeCode, ProcessOutcome, RequestId, Timestamp, VerificationRequest};

use crate::{LmdbError, LmdbStore};

/// Build the dispatch-queue key `verified_at_be ++ request_id`.
pub(crate) fn queue_key(verified_at: Timestamp, id: &RequestId) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 16);
    key.extend_from_slice(&verified_at.to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

pub(crate) fn decode_id(bytes: &[u8]) -> Result<RequestId, LmdbError> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization("invalid request id length".into()))?;
    Ok(RequestId::from_bytes(arr))
}

fn load_request(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    id: &RequestId,
) -> Result<Option<VerificationRequest>, LmdbError> {
    match db.get(txn, id.as_bytes())? {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
        None => Ok(None),
    }
}

impl LmdbStore {
    fn lookup_code(
        &self,
        txn: &RoTxn,
        code: &ChallengeCode,
    ) -> Result<Option<VerificationRequest>, LmdbError> {
        let id = match self.codes_db.get(txn, code.as_str().as_bytes())? {
            Some(bytes) => decode_id(bytes)?,
            None => return Ok(None),
        };
        load_request(&self.requests_db, txn, &id)
    }
}

impl RequestStore for LmdbStore {
    fn create(&self, request: &VerificationRequest) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        if load_request(&self.requests_db, &wtxn, &request.id)?.is_some() {
            return Err(StoreError::Duplicate(format!("request {}", request.id)));
        }
        if let Some(holder) = self.lookup_code(&wtxn, &request.challenge_code)? {
            if !holder.is_expired(request.created_at) {
                return Err(StoreError::Duplicate(format!(
                    "challenge code {}",
                    request.challenge_code
                )));
            }
        }

        let bytes = bincode::serialize(request).map_err(LmdbError::from)?;
        self.requests_db
            .put(&mut wtxn, request.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.codes_db
            .put(
                &mut wtxn,
                request.challenge_code.as_str().as_bytes(),
                request.id.as_bytes(),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn find_by_code(
        &self,
        code: &ChallengeCode,
    ) -> Result<Option<VerificationRequest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.lookup_code(&rtxn, code)?)
    }

    fn get(&self, id: &RequestId) -> Result<Option<VerificationRequest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(load_request(&self.requests_db, &rtxn, id)?)
    }

    fn mark_verified(&self, code: &ChallengeCode, now: Timestamp) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut request = match self.lookup_code(&wtxn, code)? {
            Some(request) => request,
            None => return Ok(false),
        };
        if !request.apply_verified(now) {
            return Ok(false);
        }

        let bytes = bincode::serialize(&request).map_err(LmdbError::from)?;
        self.requests_db
            .put(&mut wtxn, request.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.queue_db
            .put(&mut wtxn, &queue_key(now, &request.id), request.id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn list_verified_unprocessed(&self) -> Result<Vec<VerificationRequest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut pending = Vec::new();
        let iter = self.queue_db.iter(&rtxn).map_err(LmdbError::from)?;
        // A bad entry is skipped so the healthy requests behind it still
        // get dispatched; `check_integrity` reports it on the next start.
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let id = match decode_id(val) {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(error = %e, "skipping unreadable dispatch queue entry");
                    continue;
                }
            };
            match load_request(&self.requests_db, &rtxn, &id) {
                Ok(Some(request)) if request.awaits_dispatch() => pending.push(request),
                Ok(Some(_)) => {
                    tracing::warn!(request_id = %id, "dispatch queue entry for settled request");
                }
                Ok(None) => {
                    tracing::warn!(request_id = %id, "dispatch queue entry for missing request");
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %id,
                        error = %e,
                        "skipping undecodable request record"
                    );
                }
            }
        }
        Ok(pending)
    }

    fn mark_processed(
        &self,
        id: &RequestId,
        outcome: ProcessOutcome,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut request = load_request(&self.requests_db, &wtxn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("request {}", id)))?;
        if !request.apply_processed(outcome, now) {
            return Ok(false);
        }

        let bytes = bincode::serialize(&request).map_err(LmdbError::from)?;
        self.requests_db
            .put(&mut wtxn, id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        if let Some(verified_at) = request.verified_at {
            self.queue_db
                .delete(&mut wtxn, &queue_key(verified_at, id))
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut stale = Vec::new();
        {
            let iter = self.requests_db.iter(&wtxn).map_err(LmdbError::from)?;
            for result in iter {
                let (_key, val) = result.map_err(LmdbError::from)?;
                let request: VerificationRequest =
                    bincode::deserialize(val).map_err(LmdbError::from)?;
                if !request.verified && request.is_expired(now) {
                    stale.push((request.id, request.challenge_code));
                }
            }
        }

        for (id, code) in &stale {
            self.requests_db
                .delete(&mut wtxn, id.as_bytes())
                .map_err(LmdbError::from)?;
            // The code may already have been handed to a newer request.
            let holder = match self
                .codes_db
                .get(&wtxn, code.as_str().as_bytes())
                .map_err(LmdbError::from)?
            {
                Some(bytes) => Some(decode_id(bytes)?),
                None => None,
            };
            if holder.as_ref() == Some(id) {
                self.codes_db
                    .delete(&mut wtxn, code.as_str().as_bytes())
                    .map_err(LmdbError::from)?;
            }
        }

        wtxn.commit().map_err(LmdbError::from)?;
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "purged expired requests");
        }
        Ok(stale.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use likegate_types::{ReplyTarget, RequesterId};

    fn verified(store: &LmdbStore, requester: i64, code: &str, at: u64) -> VerificationRequest {
        let request = VerificationRequest::new(
            RequesterId::new(requester),
            "4000000001",
            "ind",
            ChallengeCode::parse(code).unwrap(),
            ReplyTarget {
                chat_id: 1,
                message_id: requester,
            },
            Timestamp::new(1_000),
            Timestamp::new(1_600),
        );
        store.create(&request).unwrap();
        assert!(store
            .mark_verified(&request.challenge_code, Timestamp::new(at))
            .unwrap());
        request
    }

    #[test]
    fn corrupt_record_does_not_hide_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let broken = verified(&store, 1, "AAAAAAAAAAAA", 1_001);
        let healthy = verified(&store, 2, "BBBBBBBBBBBB", 1_002);

        let mut wtxn = store.env.write_txn().unwrap();
        store
            .requests_db
            .put(&mut wtxn, broken.id.as_bytes(), b"\xff\x00garbage")
            .unwrap();
        wtxn.commit().unwrap();

        let pending = store.list_verified_unprocessed().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, healthy.id);
    }
}
