//! Cooldown / VIP eligibility decision.

use std::time::Duration;

use likegate_types::{Timestamp, UserProfile};
use likegate_utils::format_hours_minutes;

/// Minimum interval between two successful actions for a non-VIP user.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether a verified request may run the external action now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    Proceed,
    /// The user is in cooldown; `remaining` is the time left until it ends.
    Deferred { remaining: Duration },
}

impl Eligibility {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Eligibility::Proceed)
    }

    /// Remaining wait as `"{h}h {m}m"`, rounded down. `None` for `Proceed`.
    pub fn remaining_display(&self) -> Option<String> {
        match self {
            Eligibility::Proceed => None,
            Eligibility::Deferred { remaining } => Some(format_hours_minutes(*remaining)),
        }
    }
}

/// VIP bypass, otherwise a fixed cooldown since `last_used`.
#[derive(Clone, Copy, Debug)]
pub struct EligibilityPolicy {
    cooldown: Duration,
}

impl EligibilityPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decide eligibility at `now`.
    ///
    /// 1. An active VIP (`now < vip_expires`) always proceeds.
    /// 2. Otherwise, if `now - last_used < cooldown`, the request is deferred
    ///    for `cooldown - elapsed`.
    /// 3. Otherwise it proceeds.
    ///
    /// A `last_used` in the future counts as zero elapsed time.
    pub fn evaluate(&self, profile: &UserProfile, now: Timestamp) -> Eligibility {
        if profile.is_vip(now) {
            return Eligibility::Proceed;
        }

        let cooldown_secs = self.cooldown.as_secs();
        match profile.last_used {
            Some(last_used) => {
                let elapsed = last_used.elapsed_since(now);
                if elapsed < cooldown_secs {
                    Eligibility::Deferred {
                        remaining: Duration::from_secs(cooldown_secs - elapsed),
                    }
                } else {
                    Eligibility::Proceed
                }
            }
            None => Eligibility::Proceed,
        }
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
