use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::CurrentUser;
use crate::db::models::User;
use crate::db::query::{ItemQuery, SortOrder};
use crate::db::repository::ItemRepository;
use crate::error::AppError;
use crate::models::item::ItemResponse;
use crate::models::plan::require_pro;
use crate::state::AppState;

/// Items younger than this are never resurfaced.
pub const REMINDER_MIN_AGE_DAYS: i64 = 7;
pub const MAX_REMINDERS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub item: ItemResponse,
    pub days_since_saved: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersResponse {
    pub reminders: Vec<Reminder>,
    pub total: usize,
}

fn reason(days: i64) -> String {
    match days {
        d if d >= 365 => "Saved over a year ago. Still relevant?".to_string(),
        d if d >= 30 => format!("Saved {} months ago and waiting for you", d / 30),
        d => format!("Saved {d} days ago. Time to revisit?"),
    }
}

/// The oldest items saved at least a week ago. Pro only.
pub async fn process_reminders(
    items: &dyn ItemRepository,
    user: &User,
    now: DateTime<Utc>,
) -> Result<RemindersResponse, AppError> {
    require_pro(user, "Smart reminders", now)?;

    let cutoff = now - Duration::days(REMINDER_MIN_AGE_DAYS);
    let query = ItemQuery {
        created_to: Some(bson::DateTime::from_chrono(cutoff)),
        sort: SortOrder::Oldest,
        limit: MAX_REMINDERS,
        ..ItemQuery::default()
    };

    let reminders: Vec<Reminder> = items
        .query(&user.id, &query)
        .await?
        .into_iter()
        .map(|item| {
            let days = (now - item.created_at.to_chrono()).num_days();
            Reminder {
                item: item.into(),
                days_since_saved: days,
                reason: reason(days),
            }
        })
        .collect();

    Ok(RemindersResponse {
        total: reminders.len(),
        reminders,
    })
}

/// Axum handler for `GET /api/reminders`.
pub async fn reminders_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<RemindersResponse>, AppError> {
    let response = process_reminders(state.items.as_ref(), &user, Utc::now()).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::PlanType;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{AiUsage, Preferences, SavedItem};

    fn user(plan: PlanType) -> User {
        User {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            password_hash: String::new(),
            name: "a".to_string(),
            plan_type: plan,
            pro_expires_at: None,
            ai_usage: AiUsage::default(),
            preferences: Preferences::default(),
            created_at: bson::DateTime::now(),
            last_login_at: None,
        }
    }

    fn saved(id: &str, created_at: DateTime<Utc>) -> SavedItem {
        let at = bson::DateTime::from_chrono(created_at);
        SavedItem {
            id: id.to_string(),
            user_id: "u1".to_string(),
            url: format!("https://example.com/{id}"),
            title: id.to_string(),
            thumbnail_url: None,
            platform: "Web".to_string(),
            content_type: "article".to_string(),
            notes: String::new(),
            tags: vec![],
            collections: vec![],
            created_at: at,
            updated_at: at,
            ai: Default::default(),
        }
    }

    #[test]
    fn test_reason_wording() {
        assert_eq!(reason(8), "Saved 8 days ago. Time to revisit?");
        assert_eq!(reason(65), "Saved 2 months ago and waiting for you");
        assert!(reason(400).contains("over a year"));
    }

    #[tokio::test]
    async fn test_free_users_are_rejected() {
        let store = MemoryStore::new();
        match process_reminders(&store, &user(PlanType::Free), Utc::now()).await {
            Err(AppError::Forbidden(msg)) => assert!(msg.starts_with("Smart reminders")),
            other => panic!("Expected Forbidden, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_only_week_old_items_oldest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert(saved("fresh", now - Duration::days(2))).await.unwrap();
        store.insert(saved("week", now - Duration::days(8))).await.unwrap();
        store.insert(saved("month", now - Duration::days(40))).await.unwrap();

        let response = process_reminders(&store, &user(PlanType::Pro), now).await.unwrap();
        let ids: Vec<&str> = response.reminders.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(ids, vec!["month", "week"]);
        assert_eq!(response.total, 2);
        assert_eq!(response.reminders[0].days_since_saved, 40);
    }

    #[tokio::test]
    async fn test_capped_at_ten() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..15 {
            store
                .insert(saved(&format!("i{i}"), now - Duration::days(10 + i)))
                .await
                .unwrap();
        }

        let response = process_reminders(&store, &user(PlanType::Pro), now).await.unwrap();
        assert_eq!(response.total, MAX_REMINDERS);
        assert_eq!(response.reminders[0].item.id, "i14");
    }
}
