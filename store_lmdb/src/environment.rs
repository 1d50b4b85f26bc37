//! LMDB environment setup.
//!
//! Database layout:
//!
//! | name              | key                                  | value                       |
//! |-------------------|--------------------------------------|-----------------------------|
//! | `requests`        | request id (16 bytes)                | bincode `VerificationRequest` |
//! | `challenge_codes` | code (ASCII)                         | request id                  |
//! | `dispatch_queue`  | `verified_at` (u64 BE) ++ request id | request id                  |
//! | `profiles`        | requester id (i64 BE)                | bincode `UserProfile`       |
//! | `meta`            | key (ASCII)                          | raw bytes                   |
//!
//! `dispatch_queue` holds exactly the verified-but-unprocessed requests, in
//! verification order.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::migration::Migrator;
use crate::LmdbError;

/// Number of named LMDB databases.
pub const MAX_DBS: u32 = 8;

/// Default LMDB map size: 256 MiB.
pub const DEFAULT_MAP_SIZE: usize = 256 << 20;

pub(crate) const REQUESTS_DB: &str = "requests";
pub(crate) const CHALLENGE_CODES_DB: &str = "challenge_codes";
pub(crate) const DISPATCH_QUEUE_DB: &str = "dispatch_queue";
pub(crate) const PROFILES_DB: &str = "profiles";
pub(crate) const META_DB: &str = "meta";

/// Wraps the LMDB environment and all database handles.
///
/// Implements [`likegate_store::RequestStore`], [`likegate_store::ProfileStore`]
/// and [`likegate_store::MetaStore`].
pub struct LmdbStore {
    pub(crate) env: Arc<Env>,
    pub(crate) requests_db: Database<Bytes, Bytes>,
    pub(crate) codes_db: Database<Bytes, Bytes>,
    pub(crate) queue_db: Database<Bytes, Bytes>,
    pub(crate) profiles_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the data file is never modified by anything except LMDB itself.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let requests_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(REQUESTS_DB))?;
        let codes_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(CHALLENGE_CODES_DB))?;
        let queue_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(DISPATCH_QUEUE_DB))?;
        let profiles_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(PROFILES_DB))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let store = Self {
            env: Arc::new(env),
            requests_db,
            codes_db,
            queue_db,
            profiles_db,
            meta_db,
        };

        Migrator::run(&store)?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB store");
        Ok(store)
    }

    /// The underlying LMDB environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }
}
