#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::Duration;

use stash::app::router;
use stash::auth::token::TokenIssuer;
use stash::db::memory::MemoryStore;
use stash::error::AppError;
use stash::llm::client::LlmClient;
use stash::metadata::fetcher::{MetadataFetcher, UrlMetadata};
use stash::state::AppState;

/// Metadata fetcher that never touches the network.
///
/// `example.com` links get a canned title and thumbnail; everything else
/// degrades to the URL-only fallback.
pub struct StubFetcher;

#[async_trait]
impl MetadataFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> UrlMetadata {
        let mut metadata = UrlMetadata::fallback(url);
        if url.contains("example.com") {
            metadata.title = "Example Domain Article".to_string();
            metadata.thumbnail_url = Some("https://example.com/cover.png".to_string());
            metadata.suggested_tags = vec!["example".to_string(), "domain".to_string()];
        }
        metadata
    }
}

/// LLM that answers from a queue of scripted replies.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(AppError::Upstream(message)),
            None => Ok(r#"["scripted"]"#.to_string()),
        }
    }
}

/// In-process application wired to the memory store, a stub fetcher and a
/// scripted LLM.
pub struct TestEnv {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<ScriptedLlm>,
    pub tokens: TokenIssuer,
}

impl TestEnv {
    pub fn start() -> Self {
        Self::build(true)
    }

    /// Environment without an LLM configured.
    pub fn start_without_ai() -> Self {
        Self::build(false)
    }

    fn build(with_ai: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::new());
        let tokens = TokenIssuer::new("integration-secret", Duration::hours(1));

        let state = AppState {
            users: store.clone(),
            items: store.clone(),
            collections: store.clone(),
            metadata: Arc::new(StubFetcher),
            llm: if with_ai {
                Some(llm.clone() as Arc<dyn LlmClient>)
            } else {
                None
            },
            tokens: tokens.clone(),
            password_cost: 4,
        };

        Self {
            router: router(state),
            store,
            llm,
            tokens,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }
}

/// Helper: register a user and return `(access_token, user_id)`.
pub async fn register(server: &axum_test::TestServer, email: &str) -> (String, String) {
    let response = server
        .post("/api/auth/register")
        .json(&serde_json::json!({
            "email": email,
            "password": "secret123",
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Helper: upgrade the token's user to Pro.
pub async fn upgrade(server: &axum_test::TestServer, token: &str) {
    server
        .post("/api/users/upgrade-pro")
        .authorization_bearer(token)
        .await
        .assert_status_ok();
}

/// Helper: save an item and return its JSON.
pub async fn create_item(
    server: &axum_test::TestServer,
    token: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = server
        .post("/api/items")
        .authorization_bearer(token)
        .json(&body)
        .await;
    response.assert_status_ok();
    response.json()
}
