use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::Collection;

/// Body of `POST /api/collections` and `PUT /api/collections/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub item_count: u64,
    pub created_at: DateTime<Utc>,
}

impl CollectionResponse {
    pub fn new(collection: Collection, item_count: u64) -> Self {
        Self {
            id: collection.id,
            user_id: collection.user_id,
            name: collection.name,
            item_count,
            created_at: collection.created_at.to_chrono(),
        }
    }
}
