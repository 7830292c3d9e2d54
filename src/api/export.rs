use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::CurrentUser;
use crate::db::collection_repository::CollectionRepository;
use crate::db::models::User;
use crate::db::query::{ItemQuery, SortOrder};
use crate::db::repository::ItemRepository;
use crate::error::AppError;
use crate::models::collection::CollectionResponse;
use crate::models::item::ItemResponse;
use crate::models::plan::require_pro;
use crate::models::user::UserResponse;
use crate::state::AppState;

/// A full snapshot of the user's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultExport {
    pub exported_at: DateTime<Utc>,
    pub user: UserResponse,
    pub items: Vec<ItemResponse>,
    pub collections: Vec<CollectionResponse>,
    pub total_items: usize,
    pub total_collections: usize,
}

pub async fn process_export(
    items: &dyn ItemRepository,
    collections: &dyn CollectionRepository,
    user: &User,
    now: DateTime<Utc>,
) -> Result<VaultExport, AppError> {
    require_pro(user, "Vault export", now)?;

    let all_items = ItemQuery {
        sort: SortOrder::Newest,
        limit: usize::MAX,
        ..ItemQuery::default()
    };
    let items_out: Vec<ItemResponse> = items
        .query(&user.id, &all_items)
        .await?
        .into_iter()
        .map(ItemResponse::from)
        .collect();

    let mut collections_out = Vec::new();
    for collection in collections.list(&user.id, None).await? {
        let count = items_out
            .iter()
            .filter(|i| i.collections.contains(&collection.id))
            .count() as u64;
        collections_out.push(CollectionResponse::new(collection, count));
    }

    tracing::info!(
        user_id = %user.id,
        items = items_out.len(),
        collections = collections_out.len(),
        "Exported vault"
    );

    Ok(VaultExport {
        exported_at: now,
        user: UserResponse::from_user(user, now),
        total_items: items_out.len(),
        total_collections: collections_out.len(),
        items: items_out,
        collections: collections_out,
    })
}

/// Axum handler for `GET /api/export/vault`.
pub async fn export_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<VaultExport>, AppError> {
    let export = process_export(
        state.items.as_ref(),
        state.collections.as_ref(),
        &user,
        Utc::now(),
    )
    .await?;
    Ok(Json(export))
}
