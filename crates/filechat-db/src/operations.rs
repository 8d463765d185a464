//! Database CRUD operations.

pub mod chat;
pub mod files;
pub mod intents;
pub mod sessions;
pub mod stats;
