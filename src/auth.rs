//! Accounts, password hashing and bearer tokens.

pub mod middleware;
pub mod models;
pub mod password;
pub mod token;
