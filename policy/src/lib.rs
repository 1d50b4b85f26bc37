//! Eligibility policy and VIP administration.
//!
//! [`EligibilityPolicy`] is a pure decision function: given a user's profile
//! and the current time it says whether a verified request may run the
//! external action now. [`VipGrants`] is the administrative path, the only
//! writer of `vip_expires`.

pub mod eligibility;
pub mod error;
pub mod vip;

pub use eligibility::{Eligibility, EligibilityPolicy, DEFAULT_COOLDOWN};
pub use error::PolicyError;
pub use vip::{VipGrant, VipGrants, MAX_VIP_DAYS};
