use std::sync::Arc;

use chrono::Duration;

use crate::auth::token::TokenIssuer;
use crate::config::{AppConfig, StorageBackend};
use crate::db::collection_repository::{CollectionRepository, MongoCollectionRepository};
use crate::db::memory::MemoryStore;
use crate::db::repository::{ItemRepository, MongoItemRepository};
use crate::db::user_repository::{MongoUserRepository, UserRepository};
use crate::error::AppError;
use crate::llm::client::{LlmClient, OpenAiClient};
use crate::metadata::fetcher::{HttpMetadataFetcher, MetadataFetcher};

/// Shared application state for the Axum server.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub items: Arc<dyn ItemRepository>,
    pub collections: Arc<dyn CollectionRepository>,
    pub metadata: Arc<dyn MetadataFetcher>,
    /// `None` when no API key is configured; AI endpoints then answer 503.
    pub llm: Option<Arc<dyn LlmClient>>,
    pub tokens: TokenIssuer,
    /// bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
}

impl AppState {
    /// Wire repositories and clients as described by `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let (users, items, collections): (
            Arc<dyn UserRepository>,
            Arc<dyn ItemRepository>,
            Arc<dyn CollectionRepository>,
        ) = match config.storage_backend {
            StorageBackend::Mongo => {
                let db = crate::db::setup::connect(&config.mongodb_uri, &config.mongodb_database)
                    .await?;
                crate::db::setup::ensure_indexes(&db).await?;
                tracing::info!(database = %config.mongodb_database, "Connected to MongoDB");
                let users: Arc<dyn UserRepository> = Arc::new(MongoUserRepository::new(&db));
                let items: Arc<dyn ItemRepository> = Arc::new(MongoItemRepository::new(&db));
                let collections: Arc<dyn CollectionRepository> =
                    Arc::new(MongoCollectionRepository::new(&db));
                (users, items, collections)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let store = Arc::new(MemoryStore::new());
                let users: Arc<dyn UserRepository> = store.clone();
                let items: Arc<dyn ItemRepository> = store.clone();
                let collections: Arc<dyn CollectionRepository> = store;
                (users, items, collections)
            }
        };

        let metadata: Arc<dyn MetadataFetcher> = Arc::new(HttpMetadataFetcher::new(
            &config.metadata_user_agent,
            config.metadata_timeout_secs,
        )?);

        let llm: Option<Arc<dyn LlmClient>> = match &config.openai_api_key {
            Some(key) => {
                tracing::info!(model = %config.openai_model, "AI features enabled");
                Some(Arc::new(OpenAiClient::new(
                    key,
                    config.openai_api_base.as_deref(),
                    config.openai_model.clone(),
                )))
            }
            None => {
                tracing::info!("No OpenAI API key configured; AI features disabled");
                None
            }
        };

        Ok(Self {
            users,
            items,
            collections,
            metadata,
            llm,
            tokens: TokenIssuer::new(&config.jwt_secret, Duration::hours(config.jwt_ttl_hours)),
            password_cost: config.bcrypt_cost,
        })
    }
}
