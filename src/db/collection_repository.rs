use async_trait::async_trait;
use bson::doc;

use crate::db::models::Collection;
use crate::error::AppError;

/// Upper bound on collections returned by a listing.
pub const MAX_LISTED_COLLECTIONS: usize = 100;

/// Repository trait for collections, scoped by owner like [`super::repository::ItemRepository`].
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn insert(&self, collection: Collection) -> Result<(), AppError>;

    /// The user's collections, oldest first. `None` returns all of them.
    async fn list(&self, user_id: &str, limit: Option<usize>)
        -> Result<Vec<Collection>, AppError>;

    async fn find(&self, user_id: &str, id: &str) -> Result<Option<Collection>, AppError>;

    /// Rename and return the updated collection, or `None` if it doesn't exist.
    async fn rename(
        &self,
        user_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Option<Collection>, AppError>;

    /// Returns `true` if a collection was deleted.
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError>;

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError>;
}

/// MongoDB implementation of the CollectionRepository.
pub struct MongoCollectionRepository {
    collection: mongodb::Collection<Collection>,
}

impl MongoCollectionRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("collections"),
        }
    }
}

#[async_trait]
impl CollectionRepository for MongoCollectionRepository {
    async fn insert(&self, collection: Collection) -> Result<(), AppError> {
        self.collection
            .insert_one(&collection)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Collection>, AppError> {
        use mongodb::options::FindOptions;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .limit(limit.and_then(|l| i64::try_from(l).ok()))
            .build();

        let mut cursor = self
            .collection
            .find(doc! { "user_id": user_id })
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut collections = Vec::new();
        use futures::TryStreamExt;
        while let Some(collection) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            collections.push(collection);
        }

        Ok(collections)
    }

    async fn find(&self, user_id: &str, id: &str) -> Result<Option<Collection>, AppError> {
        self.collection
            .find_one(doc! { "id": id, "user_id": user_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn rename(
        &self,
        user_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Option<Collection>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(
                doc! { "id": id, "user_id": user_id },
                doc! { "$set": { "name": name } },
            )
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = self
            .collection
            .delete_one(doc! { "id": id, "user_id": user_id })
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
}
