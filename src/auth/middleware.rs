use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::state::AppState;
use crate::db::models::User;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

/// The authenticated caller, resolved from the `Authorization: Bearer` header.
///
/// Rejects with 401 when the header is missing, the token does not verify, or
/// the user it names no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Auth("Not authenticated".into()))?;

        let user = resolve_user(state.users.as_ref(), &state.tokens, bearer.token()).await?;
        Ok(CurrentUser(user))
    }
}

/// Verify `token` and load the user it was issued for.
pub async fn resolve_user(
    users: &dyn UserRepository,
    tokens: &crate::auth::token::TokenIssuer,
    token: &str,
) -> Result<User, AppError> {
    let claims = tokens.verify(token)?;

    users.find_by_id(&claims.sub).await?.ok_or_else(|| {
        tracing::debug!(user_id = %claims.sub, "Token names an unknown user");
        AppError::Auth("User not found".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenIssuer;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{AiUsage, Preferences};
    use chrono::{Duration, Utc};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            name: id.to_string(),
            plan_type: Default::default(),
            pro_expires_at: None,
            ai_usage: AiUsage::default(),
            preferences: Preferences::default(),
            created_at: bson::DateTime::now(),
            last_login_at: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_known_user() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, user("u1")).await.unwrap();
        let tokens = TokenIssuer::new("secret", Duration::hours(1));
        let token = tokens.issue("u1", Utc::now()).unwrap();

        let resolved = resolve_user(&store, &tokens, &token).await.unwrap();
        assert_eq!(resolved.id, "u1");
    }

    #[tokio::test]
    async fn test_resolve_unknown_user() {
        let store = MemoryStore::new();
        let tokens = TokenIssuer::new("secret", Duration::hours(1));
        let token = tokens.issue("ghost", Utc::now()).unwrap();

        match resolve_user(&store, &tokens, &token).await {
            Err(AppError::Auth(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("Expected Auth error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_garbage_token() {
        let store = MemoryStore::new();
        let tokens = TokenIssuer::new("secret", Duration::hours(1));

        match resolve_user(&store, &tokens, "not-a-jwt").await {
            Err(AppError::Auth(msg)) => assert_eq!(msg, "Invalid token"),
            other => panic!("Expected Auth error, got: {:?}", other),
        }
    }
}
