//! Error types for the ingestion and retrieval pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while ingesting or answering.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] filechat_db::DbError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Parse error for {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("No text could be extracted from {0}")]
    EmptyContent(String),

    #[error("Media processing error: {0}")]
    Process(#[from] filechat_process::ProcessError),

    #[error("Model error: {0}")]
    Model(#[from] filechat_ollama::OllamaError),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<filechat_core::Error> for IngestError {
    fn from(err: filechat_core::Error) -> Self {
        match err {
            filechat_core::Error::InvalidInput(message) => IngestError::Validation(message),
        }
    }
}
