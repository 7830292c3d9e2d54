use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

/// Build the HTTP router with every `/api` route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/", get(api::health::root_handler))
        .route("/api/health", get(api::health::health_handler))
        // Auth
        .route("/api/auth/register", post(api::auth::register_handler))
        .route("/api/auth/login", post(api::auth::login_handler))
        .route("/api/auth/me", get(api::auth::me_handler))
        // Plan and preferences
        .route("/api/users/plan", get(api::users::plan_handler))
        .route("/api/users/upgrade-pro", post(api::users::upgrade_handler))
        .route("/api/users/cancel-pro", post(api::users::cancel_handler))
        .route("/api/users/preferences", put(api::users::preferences_handler))
        // Items
        .route(
            "/api/extract-metadata",
            post(api::metadata::extract_metadata_handler),
        )
        .route(
            "/api/items",
            get(api::items::list_items_handler).post(api::items::create_item_handler),
        )
        .route(
            "/api/items/{id}",
            get(api::items::get_item_handler)
                .put(api::items::update_item_handler)
                .delete(api::items::delete_item_handler),
        )
        .route(
            "/api/items/{id}/apply-suggestions",
            post(api::items::apply_suggestions_handler),
        )
        // AI
        .route("/api/items/{id}/ai-summary", post(api::ai::summary_handler))
        .route(
            "/api/items/{id}/extract-ideas",
            post(api::ai::key_ideas_handler),
        )
        .route("/api/items/{id}/smart-tags", post(api::ai::smart_tags_handler))
        .route(
            "/api/items/{id}/action-items",
            post(api::ai::action_items_handler),
        )
        .route(
            "/api/items/{id}/suggest-collection",
            post(api::ai::suggest_collection_handler),
        )
        // Collections
        .route(
            "/api/collections",
            get(api::collections::list_collections_handler)
                .post(api::collections::create_collection_handler),
        )
        .route(
            "/api/collections/{id}",
            put(api::collections::rename_collection_handler)
                .delete(api::collections::delete_collection_handler),
        )
        // Search
        .route("/api/search", get(api::search::search_handler))
        .route(
            "/api/search/advanced",
            get(api::search::advanced_search_handler),
        )
        .route("/api/tags", get(api::search::tags_handler))
        // Pro
        .route("/api/reminders", get(api::reminders::reminders_handler))
        .route("/api/export/vault", get(api::export::export_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
