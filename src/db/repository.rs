use async_trait::async_trait;
use bson::{doc, DateTime, Document};

use crate::db::models::SavedItem;
use crate::db::query::ItemQuery;
use crate::error::AppError;

/// Partial update of a saved item. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub collections: Option<Vec<String>>,
    pub ai_summary: Option<Vec<String>>,
    pub ai_key_ideas: Option<Vec<String>>,
    pub ai_suggested_tags: Option<Vec<String>>,
    pub ai_action_items: Option<Vec<String>>,
    pub ai_generated_at: Option<DateTime>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.tags.is_none()
            && self.collections.is_none()
            && self.ai_summary.is_none()
            && self.ai_key_ideas.is_none()
            && self.ai_suggested_tags.is_none()
            && self.ai_action_items.is_none()
            && self.ai_generated_at.is_none()
    }

    /// Apply the patch in place, stamping `updated_at`.
    pub fn apply(&self, item: &mut SavedItem, now: DateTime) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            item.notes = notes.clone();
        }
        if let Some(tags) = &self.tags {
            item.tags = tags.clone();
        }
        if let Some(collections) = &self.collections {
            item.collections = collections.clone();
        }
        if let Some(summary) = &self.ai_summary {
            item.ai.summary = summary.clone();
        }
        if let Some(ideas) = &self.ai_key_ideas {
            item.ai.key_ideas = ideas.clone();
        }
        if let Some(tags) = &self.ai_suggested_tags {
            item.ai.suggested_tags = tags.clone();
        }
        if let Some(actions) = &self.ai_action_items {
            item.ai.action_items = actions.clone();
        }
        if let Some(at) = self.ai_generated_at {
            item.ai.generated_at = Some(at);
        }
        item.updated_at = now;
    }

    /// The `$set` document equivalent to [`ItemPatch::apply`].
    pub fn to_set_document(&self, now: DateTime) -> Document {
        let mut set = doc! { "updated_at": now };

        if let Some(title) = &self.title {
            set.insert("title", title.as_str());
        }
        if let Some(notes) = &self.notes {
            set.insert("notes", notes.as_str());
        }
        if let Some(tags) = &self.tags {
            set.insert("tags", tags.clone());
        }
        if let Some(collections) = &self.collections {
            set.insert("collections", collections.clone());
        }
        if let Some(summary) = &self.ai_summary {
            set.insert("ai.summary", summary.clone());
        }
        if let Some(ideas) = &self.ai_key_ideas {
            set.insert("ai.key_ideas", ideas.clone());
        }
        if let Some(tags) = &self.ai_suggested_tags {
            set.insert("ai.suggested_tags", tags.clone());
        }
        if let Some(actions) = &self.ai_action_items {
            set.insert("ai.action_items", actions.clone());
        }
        if let Some(at) = self.ai_generated_at {
            set.insert("ai.generated_at", at);
        }

        set
    }
}

/// Repository trait for saved items.
///
/// Every method is scoped by the owning user id; items of other users
/// behave as if they did not exist.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn insert(&self, item: SavedItem) -> Result<(), AppError>;

    async fn find(&self, user_id: &str, item_id: &str) -> Result<Option<SavedItem>, AppError>;

    /// List items matching `query`, sorted and capped as it specifies.
    async fn query(&self, user_id: &str, query: &ItemQuery) -> Result<Vec<SavedItem>, AppError>;

    /// Apply a patch and return the updated item, or `None` if it doesn't exist.
    async fn update(
        &self,
        user_id: &str,
        item_id: &str,
        patch: ItemPatch,
    ) -> Result<Option<SavedItem>, AppError>;

    /// Returns `true` if an item was deleted.
    async fn delete(&self, user_id: &str, item_id: &str) -> Result<bool, AppError>;

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError>;

    async fn count_in_collection(&self, user_id: &str, collection_id: &str)
        -> Result<u64, AppError>;

    /// Pull `collection_id` from every item of the user. Returns the number of items touched.
    async fn remove_collection(&self, user_id: &str, collection_id: &str)
        -> Result<u64, AppError>;

    /// Distinct tags across the user's items, sorted ascending.
    async fn distinct_tags(&self, user_id: &str) -> Result<Vec<String>, AppError>;
}

/// MongoDB implementation of the ItemRepository.
pub struct MongoItemRepository {
    collection: mongodb::Collection<SavedItem>,
}

impl MongoItemRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("items"),
        }
    }
}

#[async_trait]
impl ItemRepository for MongoItemRepository {
    async fn insert(&self, item: SavedItem) -> Result<(), AppError> {
        self.collection
            .insert_one(&item)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find(&self, user_id: &str, item_id: &str) -> Result<Option<SavedItem>, AppError> {
        self.collection
            .find_one(doc! { "id": item_id, "user_id": user_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn query(&self, user_id: &str, query: &ItemQuery) -> Result<Vec<SavedItem>, AppError> {
        use mongodb::options::FindOptions;

        let options = FindOptions::builder()
            .sort(query.sort_document())
            .limit(i64::try_from(query.limit).ok())
            .build();

        let mut cursor = self
            .collection
            .find(query.to_filter(user_id))
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut items = Vec::new();
        use futures::TryStreamExt;
        while let Some(item) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            items.push(item);
        }

        Ok(items)
    }

    async fn update(
        &self,
        user_id: &str,
        item_id: &str,
        patch: ItemPatch,
    ) -> Result<Option<SavedItem>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        if patch.is_empty() {
            return self.find(user_id, item_id).await;
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(
                doc! { "id": item_id, "user_id": user_id },
                doc! { "$set": patch.to_set_document(DateTime::now()) },
            )
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete(&self, user_id: &str, item_id: &str) -> Result<bool, AppError> {
        let result = self
            .collection
            .delete_one(doc! { "id": item_id, "user_id": user_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.deleted_count > 0)
    }

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        self.collection
            .count_documents(doc! { "user_id": user_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_in_collection(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> Result<u64, AppError> {
        self.collection
            .count_documents(doc! { "user_id": user_id, "collections": collection_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn remove_collection(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> Result<u64, AppError> {
        let result = self
            .collection
            .update_many(
                doc! { "user_id": user_id, "collections": collection_id },
                doc! {
                    "$pull": { "collections": collection_id },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.modified_count)
    }

    async fn distinct_tags(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let values = self
            .collection
            .distinct("tags", doc! { "user_id": user_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut tags: Vec<String> = values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        tags.sort();

        Ok(tags)
    }
}
