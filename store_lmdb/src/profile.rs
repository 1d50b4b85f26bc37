//! LMDB implementation of ProfileStore.

use likegate_store::profile::ProfileStore;
use likegate_store::StoreError;
use likegate_types::{ProfileUpdate, RequesterId, UserProfile};

use crate::{LmdbError, LmdbStore};

impl ProfileStore for LmdbStore {
    fn get_profile(&self, requester: RequesterId) -> Result<Option<UserProfile>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .profiles_db
            .get(&rtxn, &requester.to_be_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let profile: UserProfile = bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    fn upsert_profile(
        &self,
        requester: RequesterId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, StoreError> {
        let key = requester.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let existing = match self.profiles_db.get(&wtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => {
                Some(bincode::deserialize::<UserProfile>(bytes).map_err(LmdbError::from)?)
            }
            None => None,
        };
        let mut profile = existing.unwrap_or_else(|| UserProfile::new(requester));
        profile.apply(update);

        let bytes = bincode::serialize(&profile).map_err(LmdbError::from)?;
        self.profiles_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(profile)
    }
}
