use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::auth::middleware::CurrentUser;
use crate::db::collection_repository::{CollectionRepository, MAX_LISTED_COLLECTIONS};
use crate::db::models::{Collection, User};
use crate::db::repository::ItemRepository;
use crate::error::AppError;
use crate::models::collection::{CollectionRequest, CollectionResponse};
use crate::models::plan::check_collection_quota;
use crate::state::AppState;

fn collection_not_found() -> AppError {
    AppError::NotFound("Collection not found".into())
}

fn validated_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Collection name cannot be empty".into()));
    }
    Ok(name.to_string())
}

pub async fn process_create_collection(
    collections: &dyn CollectionRepository,
    user: &User,
    request: CollectionRequest,
    now: DateTime<Utc>,
) -> Result<CollectionResponse, AppError> {
    let name = validated_name(&request.name)?;

    let current = collections.count_for_user(&user.id).await?;
    check_collection_quota(user, current, now)?;

    let collection = Collection {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        name,
        created_at: bson::DateTime::from_chrono(now),
    };
    collections.insert(collection.clone()).await?;

    Ok(CollectionResponse::new(collection, 0))
}

/// The user's collections with their item counts, oldest first.
pub async fn process_list_collections(
    collections: &dyn CollectionRepository,
    items: &dyn ItemRepository,
    user_id: &str,
) -> Result<Vec<CollectionResponse>, AppError> {
    let mut result = Vec::new();
    for collection in collections
        .list(user_id, Some(MAX_LISTED_COLLECTIONS))
        .await?
    {
        let item_count = items.count_in_collection(user_id, &collection.id).await?;
        result.push(CollectionResponse::new(collection, item_count));
    }
    Ok(result)
}

pub async fn process_rename_collection(
    collections: &dyn CollectionRepository,
    items: &dyn ItemRepository,
    user_id: &str,
    collection_id: &str,
    request: CollectionRequest,
) -> Result<CollectionResponse, AppError> {
    let name = validated_name(&request.name)?;

    let collection = collections
        .rename(user_id, collection_id, &name)
        .await?
        .ok_or_else(collection_not_found)?;
    let item_count = items.count_in_collection(user_id, collection_id).await?;

    Ok(CollectionResponse::new(collection, item_count))
}

/// Delete a collection and detach it from the owner's items. Items are kept.
pub async fn process_delete_collection(
    collections: &dyn CollectionRepository,
    items: &dyn ItemRepository,
    user_id: &str,
    collection_id: &str,
) -> Result<(), AppError> {
    if !collections.delete(user_id, collection_id).await? {
        return Err(collection_not_found());
    }

    let detached = items.remove_collection(user_id, collection_id).await?;
    tracing::debug!(%user_id, %collection_id, detached, "Deleted collection");
    Ok(())
}

/// Axum handler for `POST /api/collections`.
pub async fn create_collection_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CollectionRequest>,
) -> Result<Json<CollectionResponse>, AppError> {
    let collection =
        process_create_collection(state.collections.as_ref(), &user, request, Utc::now()).await?;
    Ok(Json(collection))
}

/// Axum handler for `GET /api/collections`.
pub async fn list_collections_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CollectionResponse>>, AppError> {
    let collections =
        process_list_collections(state.collections.as_ref(), state.items.as_ref(), &user.id)
            .await?;
    Ok(Json(collections))
}

/// Axum handler for `PUT /api/collections/{id}`.
pub async fn rename_collection_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<String>,
    Json(request): Json<CollectionRequest>,
) -> Result<Json<CollectionResponse>, AppError> {
    let collection = process_rename_collection(
        state.collections.as_ref(),
        state.items.as_ref(),
        &user.id,
        &collection_id,
        request,
    )
    .await?;
    Ok(Json(collection))
}

/// Axum handler for `DELETE /api/collections/{id}`.
pub async fn delete_collection_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    process_delete_collection(
        state.collections.as_ref(),
        state.items.as_ref(),
        &user.id,
        &collection_id,
    )
    .await?;
    Ok(Json(json!({ "message": "Collection deleted" })))
}
