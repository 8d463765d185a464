//! Filechat Ollama - Ollama integration for embeddings and grounded answers.
//!
//! This crate provides an async client for Ollama's API plus the prompt
//! construction used to answer questions from retrieved chunks.

mod client;
mod error;
pub mod rag;
mod types;

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use rag::{ChatTurn, ContextItem, RagConfig, RagResponse, SourceReference};
pub use types::*;
