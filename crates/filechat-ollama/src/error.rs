//! Error types for Ollama operations.

use thiserror::Error;

/// Errors that can occur when interacting with Ollama.
#[derive(Error, Debug)]
pub enum OllamaError {
    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}. Run 'ollama pull {model}' to download it.")]
    ModelNotFound { model: String },

    /// Ollama server is not running.
    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The model answered with an empty embedding.
    #[error("Model {model} returned an empty embedding")]
    EmptyEmbedding { model: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Ollama operations.
pub type OllamaResult<T> = Result<T, OllamaError>;
