use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::models::PlanType;
use crate::db::models::{Preferences, User};
use crate::models::plan::{effective_plan, PlanFeatures, PlanLimits};

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user. `plan_type` is the effective plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub plan_type: PlanType,
    pub pro_expires_at: Option<DateTime<Utc>>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        let plan_type = effective_plan(user, now);
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            plan_type,
            pro_expires_at: match plan_type {
                PlanType::Pro => user.pro_expires_at.map(|d| d.to_chrono()),
                PlanType::Free => None,
            },
            preferences: user.preferences.clone(),
            created_at: user.created_at.to_chrono(),
        }
    }
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: UserResponse) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

/// Partial preference update; absent flags keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub onboarding_completed: Option<bool>,
    pub smart_reminders: Option<bool>,
    pub weekly_digest: Option<bool>,
}

impl PreferencesUpdate {
    pub fn apply(&self, preferences: &mut Preferences) {
        if let Some(v) = self.onboarding_completed {
            preferences.onboarding_completed = v;
        }
        if let Some(v) = self.smart_reminders {
            preferences.smart_reminders = v;
        }
        if let Some(v) = self.weekly_digest {
            preferences.weekly_digest = v;
        }
    }
}

/// Current usage against plan limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanUsage {
    pub items: u64,
    pub collections: u64,
    pub ai_generations_this_month: i64,
}

/// Body of `GET /api/users/plan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub plan_type: PlanType,
    pub is_pro: bool,
    pub pro_expires_at: Option<DateTime<Utc>>,
    pub limits: PlanLimits,
    pub features: PlanFeatures,
    pub usage: PlanUsage,
}

/// Body returned by upgrade/cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanChangeResponse {
    pub message: String,
    pub plan_type: PlanType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_expires_at: Option<DateTime<Utc>>,
}
