//! Error types for Filechat.

use thiserror::Error;

/// Core error type for Filechat operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using Filechat's Error.
pub type Result<T> = std::result::Result<T, Error>;
