//! User profile storage trait.

use crate::StoreError;
use likegate_types::{ProfileUpdate, RequesterId, UserProfile};

pub trait ProfileStore: Send + Sync {
    fn get_profile(&self, requester: RequesterId) -> Result<Option<UserProfile>, StoreError>;

    /// Create the profile if missing, then apply `update` atomically.
    /// Returns the profile as written.
    fn upsert_profile(
        &self,
        requester: RequesterId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, StoreError>;
}
