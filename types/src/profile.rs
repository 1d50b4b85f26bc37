//! Per-user profile: VIP status and cooldown bookkeeping.

use serde::{Deserialize, Serialize};

use crate::{RequesterId, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub requester_id: RequesterId,
    /// Absent or in the past means not VIP.
    pub vip_expires: Option<Timestamp>,
    /// Time of the last successful external action.
    pub last_used: Option<Timestamp>,
}

impl UserProfile {
    /// A profile for a user the store has never seen.
    pub fn new(requester_id: RequesterId) -> Self {
        Self {
            requester_id,
            vip_expires: None,
            last_used: None,
        }
    }

    pub fn is_vip(&self, now: Timestamp) -> bool {
        self.vip_expires.is_some_and(|expires| now < expires)
    }

    /// Merge an update into this profile. Fields left `None` are untouched.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(vip_expires) = update.vip_expires {
            self.vip_expires = Some(vip_expires);
        }
        if let Some(last_used) = update.last_used {
            self.last_used = Some(last_used);
        }
    }
}

/// Partial profile write used by upserts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub vip_expires: Option<Timestamp>,
    pub last_used: Option<Timestamp>,
}

impl ProfileUpdate {
    pub fn last_used(at: Timestamp) -> Self {
        Self {
            last_used: Some(at),
            ..Default::default()
        }
    }

    pub fn vip_until(expires: Timestamp) -> Self {
        Self {
            vip_expires: Some(expires),
            ..Default::default()
        }
    }
}
