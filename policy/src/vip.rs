//! Administrative VIP grants.

use std::sync::Arc;
use std::time::Duration;

use likegate_store::ProfileStore;
use likegate_types::{Clock, ProfileUpdate, RequesterId, Timestamp};

use crate::PolicyError;

/// Upper bound on a single grant (about ten years).
pub const MAX_VIP_DAYS: u32 = 3650;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Result of a successful grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VipGrant {
    pub target: RequesterId,
    pub vip_expires: Timestamp,
}

/// Writes `vip_expires` on behalf of an already-authorized operator.
pub struct VipGrants {
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
}

impl VipGrants {
    pub fn new(profiles: Arc<dyn ProfileStore>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    /// Make `target` a VIP for `days` days from now.
    ///
    /// The new expiry replaces any previous one; it is not added to it.
    pub fn grant(&self, target: RequesterId, days: u32) -> Result<VipGrant, PolicyError> {
        if days == 0 || days > MAX_VIP_DAYS {
            return Err(PolicyError::Validation(format!(
                "days must be between 1 and {}, got {}",
                MAX_VIP_DAYS, days
            )));
        }

        let now = self.clock.now();
        let vip_expires = now.plus(Duration::from_secs(u64::from(days) * SECS_PER_DAY));
        self.profiles
            .upsert_profile(target, &ProfileUpdate::vip_until(vip_expires))?;

        tracing::info!(
            requester_id = %target,
            days,
            vip_expires = vip_expires.as_secs(),
            "VIP granted"
        );
        Ok(VipGrant {
            target,
            vip_expires,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use likegate_nullables::{NullClock, NullStore};

    fn grants(now: u64) -> (Arc<NullStore>, Arc<NullClock>, VipGrants) {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(now));
        let grants = VipGrants::new(store.clone(), clock.clone());
        (store, clock, grants)
    }

    #[test]
    fn grant_sets_expiry_days_from_now() {
        let (store, _clock, grants) = grants(1_000);
        let grant = grants.grant(RequesterId::new(9), 7).unwrap();
        assert_eq!(grant.vip_expires, Timestamp::new(1_000 + 7 * SECS_PER_DAY));

        let profile = store.get_profile(RequesterId::new(9)).unwrap().unwrap();
        assert_eq!(profile.vip_expires, Some(grant.vip_expires));
        assert_eq!(profile.last_used, None);
    }

    #[test]
    fn regrant_overwrites_previous_expiry() {
        let (store, clock, grants) = grants(1_000);
        grants.grant(RequesterId::new(9), 30).unwrap();
        clock.advance(SECS_PER_DAY);
        let second = grants.grant(RequesterId::new(9), 1).unwrap();

        let profile = store.get_profile(RequesterId::new(9)).unwrap().unwrap();
        assert_eq!(profile.vip_expires, Some(second.vip_expires));
        assert_eq!(second.vip_expires, Timestamp::new(1_000 + 2 * SECS_PER_DAY));
    }

    #[test]
    fn out_of_range_days_rejected_without_write() {
        let (store, _clock, grants) = grants(1_000);
        assert!(matches!(
            grants.grant(RequesterId::new(9), 0),
            Err(PolicyError::Validation(_))
        ));
        assert!(grants.grant(RequesterId::new(9), MAX_VIP_DAYS + 1).is_err());
        assert!(store.get_profile(RequesterId::new(9)).unwrap().is_none());
    }

    #[test]
    fn store_failure_surfaces() {
        let (store, _clock, grants) = grants(1_000);
        store.fail_writes(true);
        assert!(matches!(
            grants.grant(RequesterId::new(9), 3),
            Err(PolicyError::Store(_))
        ));
    }
}
