pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod api {
    pub mod ai;
    pub mod auth;
    pub mod collections;
    pub mod errors;
    pub mod export;
    pub mod health;
    pub mod items;
    pub mod metadata;
    pub mod reminders;
    pub mod search;
    pub mod users;
}
pub mod db {
    pub mod collection_repository;
    pub mod memory;
    pub mod models;
    pub mod query;
    pub mod repository;
    pub mod setup;
    pub mod user_repository;
}
pub mod llm {
    pub mod client;
    pub mod parse;
}
pub mod metadata {
    pub mod fetcher;
    pub mod platform;
}
pub mod models {
    pub mod collection;
    pub mod item;
    pub mod plan;
    pub mod user;
}
