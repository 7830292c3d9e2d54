use std::sync::RwLock;

use async_trait::async_trait;
use bson::DateTime;

use crate::auth::models::PlanType;
use crate::db::collection_repository::CollectionRepository;
use crate::db::models::{AiUsage, Collection, Preferences, SavedItem, User};
use crate::db::query::{ItemQuery, SortOrder};
use crate::db::repository::{ItemPatch, ItemRepository};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

/// Process-local store implementing every repository trait.
///
/// Selected with `STASH_STORAGE_BACKEND=memory`; data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    items: RwLock<Vec<SavedItem>>,
    collections: RwLock<Vec<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("memory store lock poisoned".into())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: User) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        users.push(user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn set_plan(
        &self,
        id: &str,
        plan: PlanType,
        expires_at: Option<DateTime>,
    ) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.plan_type = plan;
            user.pro_expires_at = expires_at;
        }
        Ok(())
    }

    async fn set_preferences(&self, id: &str, preferences: &Preferences) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.preferences = preferences.clone();
        }
        Ok(())
    }

    async fn try_consume_ai_generation(
        &self,
        id: &str,
        month: &str,
        limit: Option<i64>,
    ) -> Result<bool, AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };

        if user.ai_usage.month != month {
            user.ai_usage = AiUsage {
                month: month.to_string(),
                count: 0,
            };
        }
        if limit.is_some_and(|l| user.ai_usage.count >= l) {
            return Ok(false);
        }
        user.ai_usage.count += 1;
        Ok(true)
    }

    async fn release_ai_generation(&self, id: &str, month: &str) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if let Some(user) = users
            .iter_mut()
            .find(|u| u.id == id && u.ai_usage.month == month && u.ai_usage.count > 0)
        {
            user.ai_usage.count -= 1;
        }
        Ok(())
    }

    async fn record_login(&self, id: &str, at: DateTime) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn insert(&self, item: SavedItem) -> Result<(), AppError> {
        self.items.write().map_err(poisoned)?.push(item);
        Ok(())
    }

    async fn find(&self, user_id: &str, item_id: &str) -> Result<Option<SavedItem>, AppError> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items
            .iter()
            .find(|i| i.id == item_id && i.user_id == user_id)
            .cloned())
    }

    async fn query(&self, user_id: &str, query: &ItemQuery) -> Result<Vec<SavedItem>, AppError> {
        let items = self.items.read().map_err(poisoned)?;
        let mut matched: Vec<SavedItem> = items
            .iter()
            .filter(|i| i.user_id == user_id && query.matches(i))
            .cloned()
            .collect();

        // Stable sorts: insertion order breaks timestamp ties, like `_id` does in MongoDB.
        match query.sort {
            SortOrder::Oldest => matched.sort_by_key(|i| i.created_at),
            SortOrder::Newest => {
                matched.reverse();
                matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }
        matched.truncate(query.limit);

        Ok(matched)
    }

    async fn update(
        &self,
        user_id: &str,
        item_id: &str,
        patch: ItemPatch,
    ) -> Result<Option<SavedItem>, AppError> {
        let mut items = self.items.write().map_err(poisoned)?;
        let Some(item) = items
            .iter_mut()
            .find(|i| i.id == item_id && i.user_id == user_id)
        else {
            return Ok(None);
        };

        if !patch.is_empty() {
            patch.apply(item, DateTime::now());
        }
        Ok(Some(item.clone()))
    }

    async fn delete(&self, user_id: &str, item_id: &str) -> Result<bool, AppError> {
        let mut items = self.items.write().map_err(poisoned)?;
        let before = items.len();
        items.retain(|i| !(i.id == item_id && i.user_id == user_id));
        Ok(items.len() < before)
    }

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.iter().filter(|i| i.user_id == user_id).count() as u64)
    }

    async fn count_in_collection(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> Result<u64, AppError> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items
            .iter()
            .filter(|i| i.user_id == user_id && i.collections.iter().any(|c| c == collection_id))
            .count() as u64)
    }

    async fn remove_collection(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> Result<u64, AppError> {
        let mut items = self.items.write().map_err(poisoned)?;
        let now = DateTime::now();
        let mut touched = 0;
        for item in items.iter_mut().filter(|i| i.user_id == user_id) {
            let before = item.collections.len();
            item.collections.retain(|c| c != collection_id);
            if item.collections.len() < before {
                item.updated_at = now;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn distinct_tags(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let items = self.items.read().map_err(poisoned)?;
        let mut tags: Vec<String> = items
            .iter()
            .filter(|i| i.user_id == user_id)
            .flat_map(|i| i.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

#[async_trait]
impl CollectionRepository for MemoryStore {
    async fn insert(&self, collection: Collection) -> Result<(), AppError> {
        self.collections.write().map_err(poisoned)?.push(collection);
        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Collection>, AppError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut owned: Vec<Collection> = collections
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|c| c.created_at);
        if let Some(limit) = limit {
            owned.truncate(limit);
        }
        Ok(owned)
    }

    async fn find(&self, user_id: &str, id: &str) -> Result<Option<Collection>, AppError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned())
    }

    async fn rename(
        &self,
        user_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Option<Collection>, AppError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        Ok(collections
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .map(|c| {
                c.name = name.to_string();
                c.clone()
            }))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let before = collections.len();
        collections.retain(|c| !(c.id == id && c.user_id == user_id));
        Ok(collections.len() < before)
    }

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.iter().filter(|c| c.user_id == user_id).count() as u64)
    }
}
