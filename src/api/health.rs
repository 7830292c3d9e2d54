use axum::Json;
use serde_json::{json, Value};

/// Axum handler for `GET /api/`.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Stash API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Axum handler for `GET /api/health`.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
