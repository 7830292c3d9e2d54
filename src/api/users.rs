use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};

use crate::auth::middleware::CurrentUser;
use crate::auth::models::PlanType;
use crate::db::collection_repository::CollectionRepository;
use crate::db::models::User;
use crate::db::repository::ItemRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::models::plan::{
    ai_generations_this_month, effective_plan, pro_period_end, PlanFeatures, PlanLimits,
};
use crate::models::user::{
    PlanChangeResponse, PlanResponse, PlanUsage, PreferencesUpdate, UserResponse,
};
use crate::state::AppState;

/// Plan, limits and current usage of `user`.
pub async fn process_plan(
    items: &dyn ItemRepository,
    collections: &dyn CollectionRepository,
    user: &User,
    now: DateTime<Utc>,
) -> Result<PlanResponse, AppError> {
    let plan = effective_plan(user, now);
    let limits = PlanLimits::for_plan(plan);
    let features = PlanFeatures::from(&limits);

    Ok(PlanResponse {
        plan_type: plan,
        is_pro: plan == PlanType::Pro,
        pro_expires_at: match plan {
            PlanType::Pro => user.pro_expires_at.map(|d| d.to_chrono()),
            PlanType::Free => None,
        },
        limits,
        features,
        usage: PlanUsage {
            items: items.count_for_user(&user.id).await?,
            collections: collections.count_for_user(&user.id).await?,
            ai_generations_this_month: ai_generations_this_month(user, now),
        },
    })
}

/// Start (or restart) a Pro period ending [`crate::models::plan::PRO_PERIOD_DAYS`] from now.
pub async fn process_upgrade(
    users: &dyn UserRepository,
    user: &User,
    now: DateTime<Utc>,
) -> Result<PlanChangeResponse, AppError> {
    let expires = pro_period_end(now);
    users
        .set_plan(&user.id, PlanType::Pro, Some(bson::DateTime::from_chrono(expires)))
        .await?;

    tracing::info!(user_id = %user.id, %expires, "Upgraded to Pro");

    Ok(PlanChangeResponse {
        message: "Successfully upgraded to Pro!".to_string(),
        plan_type: PlanType::Pro,
        pro_expires_at: Some(expires),
    })
}

pub async fn process_cancel(
    users: &dyn UserRepository,
    user: &User,
) -> Result<PlanChangeResponse, AppError> {
    users.set_plan(&user.id, PlanType::Free, None).await?;

    tracing::info!(user_id = %user.id, "Cancelled Pro");

    Ok(PlanChangeResponse {
        message: "Pro subscription cancelled".to_string(),
        plan_type: PlanType::Free,
        pro_expires_at: None,
    })
}

pub async fn process_update_preferences(
    users: &dyn UserRepository,
    mut user: User,
    update: PreferencesUpdate,
    now: DateTime<Utc>,
) -> Result<UserResponse, AppError> {
    update.apply(&mut user.preferences);
    users.set_preferences(&user.id, &user.preferences).await?;
    Ok(UserResponse::from_user(&user, now))
}

/// Axum handler for `GET /api/users/plan`.
pub async fn plan_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PlanResponse>, AppError> {
    let plan = process_plan(
        state.items.as_ref(),
        state.collections.as_ref(),
        &user,
        Utc::now(),
    )
    .await?;
    Ok(Json(plan))
}

/// Axum handler for `POST /api/users/upgrade-pro`.
pub async fn upgrade_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PlanChangeResponse>, AppError> {
    let response = process_upgrade(state.users.as_ref(), &user, Utc::now()).await?;
    Ok(Json(response))
}

/// Axum handler for `POST /api/users/cancel-pro`.
pub async fn cancel_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PlanChangeResponse>, AppError> {
    let response = process_cancel(state.users.as_ref(), &user).await?;
    Ok(Json(response))
}

/// Axum handler for `PUT /api/users/preferences`.
pub async fn preferences_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<UserResponse>, AppError> {
    let response =
        process_update_preferences(state.users.as_ref(), user, update, Utc::now()).await?;
    Ok(Json(response))
}
