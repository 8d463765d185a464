//! Filechat Ingest - Ingestion and retrieval pipeline.
//!
//! This crate provides:
//! - Document parsing (text, markdown, PDF, HTML)
//! - Loading of uploads, web pages and online videos into text
//! - Content chunking for retrieval
//! - The [`Library`] façade that keeps vector indexes and the registry in step

mod backend;
mod chunker;
mod error;
mod library;
mod loader;
mod parsers;

pub use backend::{ModelBackend, OllamaBackend};
pub use chunker::{ChunkConfig, Chunker};
pub use error::{IngestError, IngestResult};
pub use filechat_ollama::{ChatTurn, SourceReference};
pub use library::{Answer, Library, RecoveryReport, RetrievalConfig, SubmitOutcome};
pub use loader::{
    classify_link, collect_files, normalize_video_link, validate_link, LinkKind, LoadedSource,
    LoaderConfig, SourceLoader, StandardLoader,
};
pub use parsers::{parse_file, ParsedDocument};
