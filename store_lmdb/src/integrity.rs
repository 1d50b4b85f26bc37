//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the dispatcher begins
//! processing requests.

use std::collections::HashSet;

use heed::types::Bytes;
use heed::{Database, RoTxn};

use likegate_types::{RequestId, VerificationRequest};

use crate::request::{decode_id, queue_key};
use crate::{LmdbError, LmdbStore};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check LMDB database integrity.
///
/// Counts every database, decodes every request, and cross-checks the
/// secondary indexes: each challenge code and each dispatch-queue entry must
/// point at an existing request, and queue entries only at requests still
/// awaiting dispatch. Problems are recorded in the report rather than
/// causing a hard error; only a failure to open a read transaction is one.
pub fn check_integrity(store: &LmdbStore) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = store.env.read_txn()?;

    for (name, db) in [
        ("profiles", &store.profiles_db),
        ("meta", &store.meta_db),
    ] {
        count(&mut report, name, db, &rtxn);
    }

    let known = check_requests(&mut report, store, &rtxn);
    check_codes(&mut report, store, &rtxn, &known);
    check_queue(&mut report, store, &rtxn);

    Ok(report)
}

fn count(report: &mut IntegrityReport, name: &str, db: &Database<Bytes, Bytes>, rtxn: &RoTxn) {
    report.databases_checked += 1;
    match db.len(rtxn) {
        Ok(n) => report.total_entries += n,
        Err(e) => report
            .errors
            .push(format!("failed to read database '{name}': {e}")),
    }
}

/// Decode every request; returns the ids that decoded.
fn check_requests(
    report: &mut IntegrityReport,
    store: &LmdbStore,
    rtxn: &RoTxn,
) -> HashSet<RequestId> {
    report.databases_checked += 1;
    let mut known = HashSet::new();
    let iter = match store.requests_db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => {
            report
                .errors
                .push(format!("failed to read database 'requests': {e}"));
            return known;
        }
    };
    for entry in iter {
        report.total_entries += 1;
        match entry {
            Ok((key, val)) => match bincode::deserialize::<VerificationRequest>(val) {
                Ok(request) if request.id.as_bytes().as_slice() == key => {
                    known.insert(request.id);
                }
                Ok(request) => report
                    .errors
                    .push(format!("request {} stored under a different key", request.id)),
                Err(e) => report.errors.push(format!("undecodable request record: {e}")),
            },
            Err(e) => report.errors.push(format!("failed to read request: {e}")),
        }
    }
    known
}

fn check_codes(
    report: &mut IntegrityReport,
    store: &LmdbStore,
    rtxn: &RoTxn,
    known: &HashSet<RequestId>,
) {
    report.databases_checked += 1;
    let iter = match store.codes_db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => {
            report
                .errors
                .push(format!("failed to read database 'challenge_codes': {e}"));
            return;
        }
    };
    for entry in iter {
        report.total_entries += 1;
        let Ok((code, val)) = entry else {
            report.errors.push("failed to read challenge code".into());
            continue;
        };
        match decode_id(val) {
            Ok(id) if known.contains(&id) => {}
            Ok(id) => report.errors.push(format!(
                "challenge code {} points at missing request {id}",
                String::from_utf8_lossy(code)
            )),
            Err(e) => report.errors.push(e.to_string()),
        }
    }
}

fn check_queue(report: &mut IntegrityReport, store: &LmdbStore, rtxn: &RoTxn) {
    report.databases_checked += 1;
    let iter = match store.queue_db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => {
            report
                .errors
                .push(format!("failed to read database 'dispatch_queue': {e}"));
            return;
        }
    };
    for entry in iter {
        report.total_entries += 1;
        let Ok((key, val)) = entry else {
            report.errors.push("failed to read dispatch queue entry".into());
            continue;
        };
        let id = match decode_id(val) {
            Ok(id) => id,
            Err(e) => {
                report.errors.push(e.to_string());
                continue;
            }
        };
        let request = store
            .requests_db
            .get(rtxn, id.as_bytes())
            .ok()
            .flatten()
            .and_then(|bytes| bincode::deserialize::<VerificationRequest>(bytes).ok());
        match request {
            Some(r) if r.awaits_dispatch() => {
                let expected = r.verified_at.map(|at| queue_key(at, &id));
                if expected.as_deref() != Some(key) {
                    report
                        .errors
                        .push(format!("dispatch queue key mismatch for request {id}"));
                }
            }
            Some(_) => report
                .errors
                .push(format!("dispatch queue holds settled request {id}")),
            None => report
                .errors
                .push(format!("dispatch queue holds missing request {id}")),
        }
    }
}
