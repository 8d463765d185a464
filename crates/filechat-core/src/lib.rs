//! Filechat Core - Domain types shared by the registry, the index store and the CLI.

mod error;
mod identifier;
mod types;

pub use error::{Error, Result};
pub use identifier::{derive_identifier, is_valid_identifier, sanitize, MAX_IDENTIFIER_LEN};
pub use types::*;
