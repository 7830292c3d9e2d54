use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier of a user.
///
/// The order of variants matters: it defines the privilege hierarchy.
/// `Free` is the least privileged, `Pro` unlocks everything.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Default tier, subject to item/collection/AI limits.
    #[default]
    Free = 0,
    /// Paid tier without limits.
    Pro = 1,
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanType::Free => write!(f, "free"),
            PlanType::Pro => write!(f, "pro"),
        }
    }
}

impl PlanType {
    /// Parse a plan type from a string (case-insensitive).
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(PlanType::Free),
            "pro" => Some(PlanType::Pro),
            _ => None,
        }
    }

    /// Returns `true` if `self` is at least the required tier.
    pub fn has_access(&self, required: PlanType) -> bool {
        *self >= required
    }
}

/// Claims carried by the bearer tokens issued at login/register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user id.
    pub sub: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
}
