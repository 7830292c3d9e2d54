use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};

use crate::auth::middleware::CurrentUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenIssuer;
use crate::db::models::{AiUsage, Preferences, User};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::models::user::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Loose syntactic check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Create an account and sign the caller in.
pub async fn process_register(
    users: &dyn UserRepository,
    tokens: &TokenIssuer,
    password_cost: u32,
    request: RegisterRequest,
    now: DateTime<Utc>,
) -> Result<TokenResponse, AppError> {
    let email = request.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        password_hash: hash_password(&request.password, password_cost).await?,
        name,
        plan_type: Default::default(),
        pro_expires_at: None,
        ai_usage: AiUsage::default(),
        preferences: Preferences::default(),
        created_at: bson::DateTime::from_chrono(now),
        last_login_at: None,
    };
    users.insert(user.clone()).await?;

    tracing::info!(user_id = %user.id, "Registered new user");

    let token = tokens.issue(&user.id, now)?;
    Ok(TokenResponse::bearer(token, UserResponse::from_user(&user, now)))
}

/// Check credentials and issue a fresh token.
pub async fn process_login(
    users: &dyn UserRepository,
    tokens: &TokenIssuer,
    request: LoginRequest,
    now: DateTime<Utc>,
) -> Result<TokenResponse, AppError> {
    let invalid = || AppError::Auth("Invalid email or password".into());

    let email = request.email.trim().to_lowercase();
    let mut user = users.find_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&request.password, &user.password_hash).await? {
        tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let at = bson::DateTime::from_chrono(now);
    users.record_login(&user.id, at).await?;
    user.last_login_at = Some(at);

    let token = tokens.issue(&user.id, now)?;
    Ok(TokenResponse::bearer(token, UserResponse::from_user(&user, now)))
}

/// Axum handler for `POST /api/auth/register`.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let response = process_register(
        state.users.as_ref(),
        &state.tokens,
        state.password_cost,
        request,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

/// Axum handler for `POST /api/auth/login`.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let response = process_login(state.users.as_ref(), &state.tokens, request, Utc::now()).await?;
    Ok(Json(response))
}

/// Axum handler for `GET /api/auth/me`.
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use chrono::Duration;

    const COST: u32 = 4;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::hours(1))
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("dev@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dev@localhost"));
        assert!(!is_valid_email("dev@example..com"));
        assert!(!is_valid_email("dev @example.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let store = MemoryStore::new();
        let tokens = issuer();
        let response = process_register(
            &store,
            &tokens,
            COST,
            register_request("  Dev@Example.com ", "secret1"),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.user.email, "dev@example.com");
        assert_eq!(response.user.name, "dev");
        assert_eq!(tokens.verify(&response.access_token).unwrap().sub, response.user.id);

        let stored = store.find_by_email("dev@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let store = MemoryStore::new();
        let tokens = issuer();
        process_register(&store, &tokens, COST, register_request("a@b.com", "secret1"), Utc::now())
            .await
            .unwrap();

        match process_register(&store, &tokens, COST, register_request("A@B.com", "secret2"), Utc::now()).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Email already registered"),
            other => panic!("Expected Conflict, got: {:?}", other),
        }
        assert!(matches!(
            process_register(&store, &tokens, COST, register_request("c@d.com", "12345"), Utc::now()).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            process_register(&store, &tokens, COST, register_request("nope", "secret1"), Utc::now()).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let store = MemoryStore::new();
        let tokens = issuer();
        process_register(&store, &tokens, COST, register_request("a@b.com", "secret1"), Utc::now())
            .await
            .unwrap();

        let ok = process_login(
            &store,
            &tokens,
            LoginRequest {
                email: "A@b.com".to_string(),
                password: "secret1".to_string(),
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(ok.user.email, "a@b.com");

        let stored = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());

        for (email, password) in [("a@b.com", "wrong"), ("missing@b.com", "secret1")] {
            let result = process_login(
                &store,
                &tokens,
                LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                Utc::now(),
            )
            .await;
            match result {
                Err(AppError::Auth(msg)) => assert_eq!(msg, "Invalid email or password"),
                other => panic!("Expected Auth error, got: {:?}", other),
            }
        }
    }
}
