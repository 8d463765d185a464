//! Filechat DB - File registry and vector index storage.

mod database;
mod error;
mod index_store;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use index_store::{cosine_similarity, IndexEntry, IndexStore, ScoredEntry, VectorIndex};
pub use operations::chat::StoredTurn;
pub use operations::files::CreateOutcome;
