//! Application configuration, read from `STASH_*` environment variables.

use serde::Deserialize;

use crate::error::AppError;

/// Secret used when `STASH_JWT_SECRET` is not set. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "stash-secret-key-change-in-production";

/// Where repositories keep their data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Memory,
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_database")]
    pub mongodb_database: String,
    /// HMAC secret for bearer tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// AI endpoints answer 503 while this is unset.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default)]
    pub openai_api_base: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,
    #[serde(default = "default_metadata_user_agent")]
    pub metadata_user_agent: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_mongodb_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongodb_database() -> String {
    "stash_db".to_string()
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

const fn default_jwt_ttl_hours() -> i64 {
    24 * 7
}

const fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_metadata_timeout_secs() -> u64 {
    10
}

fn default_metadata_user_agent() -> String {
    "Mozilla/5.0 (compatible; StashBot/1.0; +https://stash.app)".to_string()
}

impl AppConfig {
    /// Load from the process environment (`STASH_BIND_ADDR`, `STASH_MONGODB_URI`, ...).
    pub fn load() -> Result<Self, AppError> {
        Self::from_environment(config::Environment::with_prefix("STASH"))
    }

    /// Load from an explicit environment source (useful for testing).
    pub fn from_environment(source: config::Environment) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;
        app_config.openai_api_key = app_config
            .openai_api_key
            .filter(|key| !key.trim().is_empty());

        Ok(app_config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
