use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::auth::middleware::CurrentUser;
use crate::db::collection_repository::CollectionRepository;
use crate::db::models::{SavedItem, User};
use crate::db::query::{ItemQuery, SortOrder};
use crate::db::repository::{ItemPatch, ItemRepository};
use crate::error::AppError;
use crate::metadata::fetcher::MetadataFetcher;
use crate::models::item::{
    normalize_ids, normalize_tags, ApplySuggestionsRequest, CreateItemRequest, ItemResponse,
    ListItemsParams, UpdateItemRequest,
};
use crate::models::plan::check_item_quota;
use crate::state::AppState;

pub(crate) fn item_not_found() -> AppError {
    AppError::NotFound("Item not found".into())
}

/// Load one of the user's items or fail with 404.
pub async fn find_owned_item(
    items: &dyn ItemRepository,
    user_id: &str,
    item_id: &str,
) -> Result<SavedItem, AppError> {
    items.find(user_id, item_id).await?.ok_or_else(item_not_found)
}

/// Save a new item, prefilling missing fields from the link's metadata.
pub async fn process_create_item(
    items: &dyn ItemRepository,
    fetcher: &dyn MetadataFetcher,
    user: &User,
    request: CreateItemRequest,
    now: DateTime<Utc>,
) -> Result<ItemResponse, AppError> {
    let url = request.url.trim().to_string();
    if url.is_empty() {
        return Err(AppError::BadRequest("URL is required".into()));
    }

    let current = items.count_for_user(&user.id).await?;
    check_item_quota(user, current, now)?;

    let non_blank = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let mut title = non_blank(request.title);
    let mut platform = non_blank(request.platform);
    let mut content_type = non_blank(request.content_type);
    let mut thumbnail_url = non_blank(request.thumbnail_url);

    if title.is_none() || platform.is_none() {
        let metadata = fetcher.fetch(&url).await;
        title.get_or_insert(metadata.title);
        platform.get_or_insert(metadata.platform);
        content_type.get_or_insert(metadata.content_type);
        if thumbnail_url.is_none() {
            thumbnail_url = metadata.thumbnail_url;
        }
    }

    let (default_platform, default_content_type) = crate::metadata::platform::detect_platform(&url);
    let created_at = bson::DateTime::from_chrono(now);
    let item = SavedItem {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        title: title.unwrap_or_else(|| url.clone()),
        url,
        thumbnail_url,
        platform: platform.unwrap_or_else(|| default_platform.to_string()),
        content_type: content_type.unwrap_or_else(|| default_content_type.to_string()),
        notes: request.notes.unwrap_or_default(),
        tags: normalize_tags(&request.tags),
        collections: normalize_ids(&request.collections),
        created_at,
        updated_at: created_at,
        ai: Default::default(),
    };

    items.insert(item.clone()).await?;
    tracing::debug!(user_id = %user.id, item_id = %item.id, platform = %item.platform, "Saved item");

    Ok(item.into())
}

/// List the user's items with optional filters.
pub async fn process_list_items(
    items: &dyn ItemRepository,
    user_id: &str,
    params: ListItemsParams,
) -> Result<Vec<ItemResponse>, AppError> {
    let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
    let query = ItemQuery {
        sort: params
            .sort
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default(),
        platform: non_blank(params.platform),
        collection: non_blank(params.collection),
        tag: non_blank(params.tag),
        ..ItemQuery::default()
    };

    let found = items.query(user_id, &query).await?;
    Ok(found.into_iter().map(ItemResponse::from).collect())
}

/// Apply a partial update; absent fields are left untouched.
pub async fn process_update_item(
    items: &dyn ItemRepository,
    user_id: &str,
    item_id: &str,
    request: UpdateItemRequest,
) -> Result<ItemResponse, AppError> {
    let patch = ItemPatch {
        title: request.title,
        notes: request.notes,
        tags: request.tags.as_deref().map(normalize_tags),
        collections: request.collections.as_deref().map(normalize_ids),
        ..ItemPatch::default()
    };

    items
        .update(user_id, item_id, patch)
        .await?
        .map(ItemResponse::from)
        .ok_or_else(item_not_found)
}

pub async fn process_delete_item(
    items: &dyn ItemRepository,
    user_id: &str,
    item_id: &str,
) -> Result<(), AppError> {
    if items.delete(user_id, item_id).await? {
        Ok(())
    } else {
        Err(item_not_found())
    }
}

/// Adopt approved AI tag suggestions and optionally file the item into a collection.
pub async fn process_apply_suggestions(
    items: &dyn ItemRepository,
    collections: &dyn CollectionRepository,
    user_id: &str,
    item_id: &str,
    request: ApplySuggestionsRequest,
) -> Result<ItemResponse, AppError> {
    let item = find_owned_item(items, user_id, item_id).await?;

    let mut item_collections = item.collections.clone();
    if let Some(collection_id) = request.collection_id.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        if collections.find(user_id, collection_id).await?.is_none() {
            return Err(AppError::NotFound("Collection not found".into()));
        }
        if !item_collections.iter().any(|c| c == collection_id) {
            item_collections.push(collection_id.to_string());
        }
    }

    let adopted = normalize_tags(&request.tags);
    let mut tags = item.tags.clone();
    for tag in &adopted {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.clone());
        }
    }
    let remaining: Vec<String> = item
        .ai
        .suggested_tags
        .iter()
        .filter(|s| !adopted.iter().any(|a| a.eq_ignore_ascii_case(s)))
        .cloned()
        .collect();

    let patch = ItemPatch {
        tags: Some(tags),
        collections: Some(item_collections),
        ai_suggested_tags: Some(remaining),
        ..ItemPatch::default()
    };

    items
        .update(user_id, item_id, patch)
        .await?
        .map(ItemResponse::from)
        .ok_or_else(item_not_found)
}

/// Axum handler for `POST /api/items`.
pub async fn create_item_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = process_create_item(
        state.items.as_ref(),
        state.metadata.as_ref(),
        &user,
        request,
        Utc::now(),
    )
    .await?;
    Ok(Json(item))
}

/// Axum handler for `GET /api/items`.
pub async fn list_items_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = process_list_items(state.items.as_ref(), &user.id, params).await?;
    Ok(Json(items))
}

/// Axum handler for `GET /api/items/{id}`.
pub async fn get_item_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = find_owned_item(state.items.as_ref(), &user.id, &item_id).await?;
    Ok(Json(item.into()))
}

/// Axum handler for `PUT /api/items/{id}`.
pub async fn update_item_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    let item =
        process_update_item(state.items.as_ref(), &user.id, &item_id, request).await?;
    Ok(Json(item))
}

/// Axum handler for `DELETE /api/items/{id}`.
pub async fn delete_item_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    process_delete_item(state.items.as_ref(), &user.id, &item_id).await?;
    Ok(Json(json!({ "message": "Item deleted" })))
}

/// Axum handler for `POST /api/items/{id}/apply-suggestions`.
pub async fn apply_suggestions_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
    Json(request): Json<ApplySuggestionsRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = process_apply_suggestions(
        state.items.as_ref(),
        state.collections.as_ref(),
        &user.id,
        &item_id,
        request,
    )
    .await?;
    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::PlanType;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{AiUsage, Collection, Preferences};
    use crate::metadata::fetcher::UrlMetadata;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockFetcher {
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                calls: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl MetadataFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> UrlMetadata {
            self.calls.lock().unwrap().push(url.to_string());
            UrlMetadata {
                title: "Fetched Title".to_string(),
                thumbnail_url: Some("https://cdn.example.com/thumb.png".to_string()),
                platform: "YouTube".to_string(),
                content_type: "video".to_string(),
                suggested_tags: vec!["fetched".to_string()],
            }
        }
    }

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

    fn create_request(url: &str) -> CreateItemRequest {
        CreateItemRequest {
            url: url.to_string(),
            title: None,
            thumbnail_url: None,
            platform: None,
            content_type: None,
            notes: None,
            tags: vec![],
            collections: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_fills_from_metadata() {
        let store = MemoryStore::new();
        let fetcher = MockFetcher::new();
        let mut request = create_request("https://youtu.be/abc");
        request.tags = vec![" rust ".to_string(), "rust".to_string(), "".to_string()];

        let item = process_create_item(&store, &fetcher, &user(PlanType::Free), request, Utc::now())
            .await
            .unwrap();

        assert_eq!(item.title, "Fetched Title");
        assert_eq!(item.platform, "YouTube");
        assert_eq!(item.content_type, "video");
        assert_eq!(item.thumbnail_url.as_deref(), Some("https://cdn.example.com/thumb.png"));
        assert_eq!(item.tags, vec!["rust"]);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_title_and_platform_skips_fetch() {
        let store = MemoryStore::new();
        let fetcher = MockFetcher::new();
        let mut request = create_request("https://example.com/post");
        request.title = Some("Mine".to_string());
        request.platform = Some("Web".to_string());

        let item = process_create_item(&store, &fetcher, &user(PlanType::Free), request, Utc::now())
            .await
            .unwrap();

        assert_eq!(item.title, "Mine");
        assert_eq!(item.content_type, "article");
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_url() {
        let store = MemoryStore::new();
        let result = process_create_item(
            &store,
            &MockFetcher::new(),
            &user(PlanType::Free),
            create_request("   "),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let store = MemoryStore::new();
        let mut request = create_request("https://example.com");
        request.notes = Some("keep me".to_string());
        request.tags = vec!["one".to_string()];
        let created = process_create_item(&store, &MockFetcher::new(), &user(PlanType::Free), request, Utc::now())
            .await
            .unwrap();

        let updated = process_update_item(
            &store,
            "u1",
            &created.id,
            UpdateItemRequest {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.notes, "keep me");
        assert_eq!(updated.tags, vec!["one"]);
    }

    #[tokio::test]
    async fn test_foreign_item_is_not_found() {
        let store = MemoryStore::new();
        let created = process_create_item(
            &store,
            &MockFetcher::new(),
            &user(PlanType::Free),
            create_request("https://example.com"),
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(matches!(
            find_owned_item(&store, "someone-else", &created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            process_delete_item(&store, "someone-else", &created.id).await,
            Err(AppError::NotFound(_))
        ));
        process_delete_item(&store, "u1", &created.id).await.unwrap();
        assert!(matches!(
            process_delete_item(&store, "u1", &created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_suggestions() {
        let store = MemoryStore::new();
        let mut request = create_request("https://example.com");
        request.tags = vec!["rust".to_string()];
        let created = process_create_item(&store, &MockFetcher::new(), &user(PlanType::Free), request, Utc::now())
            .await
            .unwrap();

        let patch = ItemPatch {
            ai_suggested_tags: Some(vec!["async".to_string(), "tokio".to_string(), "rust".to_string()]),
            ..Default::default()
        };
        ItemRepository::update(&store, "u1", &created.id, patch)
            .await
            .unwrap();
        CollectionRepository::insert(
            &store,
            Collection {
                id: "c1".to_string(),
                user_id: "u1".to_string(),
                name: "Reading".to_string(),
                created_at: bson::DateTime::now(),
            },
        )
        .await
        .unwrap();

        let applied = process_apply_suggestions(
            &store,
            &store,
            "u1",
            &created.id,
            ApplySuggestionsRequest {
                tags: vec!["async".to_string(), "rust".to_string()],
                collection_id: Some("c1".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(applied.tags, vec!["rust", "async"]);
        assert_eq!(applied.collections, vec!["c1"]);
        assert_eq!(applied.ai.suggested_tags, vec!["tokio"]);

        let missing = process_apply_suggestions(
            &store,
            &store,
            "u1",
            &created.id,
            ApplySuggestionsRequest {
                tags: vec![],
                collection_id: Some("nope".to_string()),
            },
        )
        .await;
        match missing {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Collection not found"),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }
}
