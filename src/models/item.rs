use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{AiAnnotations, SavedItem};

/// Body of `POST /api/items`. Missing title/platform are filled from the URL.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
}

/// Body of `PUT /api/items/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub collections: Option<Vec<String>>,
}

/// Body of `POST /api/items/{id}/apply-suggestions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplySuggestionsRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
}

/// Query string of `GET /api/items`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItemsParams {
    #[serde(default)]
    pub sort: Option<String>,
    pub platform: Option<String>,
    pub collection: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiAnnotationsResponse {
    pub summary: Vec<String>,
    pub key_ideas: Vec<String>,
    pub suggested_tags: Vec<String>,
    pub action_items: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl From<&AiAnnotations> for AiAnnotationsResponse {
    fn from(ai: &AiAnnotations) -> Self {
        Self {
            summary: ai.summary.clone(),
            key_ideas: ai.key_ideas.clone(),
            suggested_tags: ai.suggested_tags.clone(),
            action_items: ai.action_items.clone(),
            generated_at: ai.generated_at.map(|d| d.to_chrono()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub platform: String,
    pub content_type: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub collections: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ai: AiAnnotationsResponse,
}

impl From<SavedItem> for ItemResponse {
    fn from(item: SavedItem) -> Self {
        let ai = AiAnnotationsResponse::from(&item.ai);
        Self {
            id: item.id,
            user_id: item.user_id,
            url: item.url,
            title: item.title,
            thumbnail_url: item.thumbnail_url,
            platform: item.platform,
            content_type: item.content_type,
            notes: item.notes,
            tags: item.tags,
            collections: item.collections,
            created_at: item.created_at.to_chrono(),
            updated_at: item.updated_at.to_chrono(),
            ai,
        }
    }
}

/// Trim tags, drop empty ones and keep the first occurrence of duplicates.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Drop empty ids and duplicates, preserving order.
pub fn normalize_ids(ids: &[String]) -> Vec<String> {
    normalize_tags(ids)
}
