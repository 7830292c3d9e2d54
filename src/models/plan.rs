//! Plan tier policy: limits, feature gates and monthly AI quota.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::models::PlanType;
use crate::db::models::User;
use crate::error::AppError;

pub const FREE_MAX_ITEMS: u64 = 50;
pub const FREE_MAX_COLLECTIONS: u64 = 5;
pub const FREE_AI_GENERATIONS_PER_MONTH: i64 = 10;

/// Length of a Pro period started by an upgrade.
pub const PRO_PERIOD_DAYS: i64 = 30;

/// Sentinel for "no limit" in API responses.
const UNLIMITED: i64 = -1;

/// Usage limits of a plan. `-1` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_items: i64,
    pub max_collections: i64,
    pub ai_generations_per_month: i64,
    pub advanced_search: bool,
    pub smart_reminders: bool,
    pub vault_export: bool,
    pub ai_features: bool,
}

impl PlanLimits {
    pub fn for_plan(plan: PlanType) -> Self {
        match plan {
            PlanType::Free => Self {
                max_items: FREE_MAX_ITEMS as i64,
                max_collections: FREE_MAX_COLLECTIONS as i64,
                ai_generations_per_month: FREE_AI_GENERATIONS_PER_MONTH,
                advanced_search: false,
                smart_reminders: false,
                vault_export: false,
                ai_features: false,
            },
            PlanType::Pro => Self {
                max_items: UNLIMITED,
                max_collections: UNLIMITED,
                ai_generations_per_month: UNLIMITED,
                advanced_search: true,
                smart_reminders: true,
                vault_export: true,
                ai_features: true,
            },
        }
    }
}

/// Feature flags shown on the paywall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatures {
    pub unlimited_collections: bool,
    pub unlimited_items: bool,
    pub advanced_search: bool,
    pub smart_reminders: bool,
    pub vault_export: bool,
    pub ai_features: bool,
}

impl From<&PlanLimits> for PlanFeatures {
    fn from(limits: &PlanLimits) -> Self {
        Self {
            unlimited_collections: limits.max_collections == UNLIMITED,
            unlimited_items: limits.max_items == UNLIMITED,
            advanced_search: limits.advanced_search,
            smart_reminders: limits.smart_reminders,
            vault_export: limits.vault_export,
            ai_features: limits.ai_features,
        }
    }
}

/// The plan a user actually has at `now`: a lapsed Pro period counts as free.
pub fn effective_plan(user: &User, now: DateTime<Utc>) -> PlanType {
    match (user.plan_type, user.pro_expires_at) {
        (PlanType::Pro, Some(expires)) if expires.to_chrono() <= now => PlanType::Free,
        (plan, _) => plan,
    }
}

/// Reject free users from a Pro-only feature.
pub fn require_pro(user: &User, feature: &str, now: DateTime<Utc>) -> Result<(), AppError> {
    if effective_plan(user, now).has_access(PlanType::Pro) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "{feature} is a Pro feature. Upgrade to unlock it."
        )))
    }
}

/// Reject saving another item once a free user holds the maximum.
pub fn check_item_quota(user: &User, current: u64, now: DateTime<Utc>) -> Result<(), AppError> {
    if effective_plan(user, now) == PlanType::Free && current >= FREE_MAX_ITEMS {
        return Err(AppError::Forbidden(format!(
            "Free plan limited to {FREE_MAX_ITEMS} saved items. Upgrade to Pro for unlimited."
        )));
    }
    Ok(())
}

/// Reject creating another collection once a free user holds the maximum.
pub fn check_collection_quota(
    user: &User,
    current: u64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if effective_plan(user, now) == PlanType::Free && current >= FREE_MAX_COLLECTIONS {
        return Err(AppError::Forbidden(format!(
            "Free plan limited to {FREE_MAX_COLLECTIONS} collections. Upgrade to Pro for unlimited."
        )));
    }
    Ok(())
}

/// `YYYY-MM` key of the UTC month containing `now`.
pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// AI generations the user has run in the month containing `now`.
pub fn ai_generations_this_month(user: &User, now: DateTime<Utc>) -> i64 {
    if user.ai_usage.month == month_key(now) {
        user.ai_usage.count
    } else {
        0
    }
}

/// Monthly AI generations allowed for the user's plan at `now`; `None` is unlimited.
pub fn ai_generation_limit(user: &User, now: DateTime<Utc>) -> Option<i64> {
    match effective_plan(user, now) {
        PlanType::Free => Some(FREE_AI_GENERATIONS_PER_MONTH),
        PlanType::Pro => None,
    }
}

pub fn ai_quota_exceeded() -> AppError {
    AppError::Forbidden(format!(
        "Free plan limited to {FREE_AI_GENERATIONS_PER_MONTH} AI generations per month. Upgrade to Pro for unlimited."
    ))
}

/// Reject an AI generation when the user's snapshot shows the allowance used up.
///
/// The counter itself is only moved by the repository, which re-checks the
/// limit atomically.
pub fn check_ai_quota(user: &User, now: DateTime<Utc>) -> Result<(), AppError> {
    match ai_generation_limit(user, now) {
        Some(limit) if ai_generations_this_month(user, now) >= limit => Err(ai_quota_exceeded()),
        _ => Ok(()),
    }
}

/// Expiry of a Pro period starting at `now`.
pub fn pro_period_end(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(PRO_PERIOD_DAYS)
}
