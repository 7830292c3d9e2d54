use bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::auth::models::PlanType;

/// A registered account, stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID v4 string.
    pub id: String,
    /// Lowercased email, unique across users.
    pub email: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
    /// Display name (defaults to the local part of the email).
    pub name: String,
    #[serde(default)]
    pub plan_type: PlanType,
    /// When the current Pro period ends. `None` for free users.
    #[serde(default)]
    pub pro_expires_at: Option<DateTime>,
    /// AI generations counted in the current month.
    #[serde(default)]
    pub ai_usage: AiUsage,
    #[serde(default)]
    pub preferences: Preferences,
    pub created_at: DateTime,
    #[serde(default)]
    pub last_login_at: Option<DateTime>,
}

/// Monthly AI generation counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiUsage {
    /// Month key in `YYYY-MM` format (UTC).
    pub month: String,
    pub count: i64,
}

/// Client-facing preference flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub smart_reminders: bool,
    #[serde(default)]
    pub weekly_digest: bool,
}

/// A bookmarked URL, stored in the `items` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Source platform label (e.g. `YouTube`, `Web`).
    pub platform: String,
    /// `video`, `post` or `article`.
    pub content_type: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of the collections this item belongs to.
    #[serde(default)]
    pub collections: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    #[serde(default)]
    pub ai: AiAnnotations,
}

/// LLM-derived fields, persisted verbatim from the last generation of each kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnnotations {
    #[serde(default)]
    pub summary: Vec<String>,
    #[serde(default)]
    pub key_ideas: Vec<String>,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime>,
}

/// A named grouping of items, stored in the `collections` collection.
///
/// Membership lives on `SavedItem::collections`; the item count is derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime,
}
