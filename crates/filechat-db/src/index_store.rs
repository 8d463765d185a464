//! On-disk vector indexes, one JSON document per identifier.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use filechat_core::is_valid_identifier;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// One embedded chunk of an ingested source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_index: usize,
    pub content: String,
    pub vector: Vec<f32>,
}

/// A chunk ranked against a query vector.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub chunk_index: usize,
    pub content: String,
    /// Cosine similarity score (-1.0 to 1.0).
    pub similarity: f32,
}

/// The vector index stored under an identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub identifier: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(identifier: impl Into<String>, embedding_model: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            embedding_model: embedding_model.into(),
            dimensions: 0,
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Append a chunk. The first vector fixes the index dimensions.
    pub fn push(&mut self, content: impl Into<String>, vector: Vec<f32>) -> DbResult<()> {
        if self.entries.is_empty() {
            self.dimensions = vector.len();
        } else if vector.len() != self.dimensions {
            return Err(DbError::Other(format!(
                "Embedding dimension mismatch in {}: expected {}, got {}",
                self.identifier,
                self.dimensions,
                vector.len()
            )));
        }

        self.entries.push(IndexEntry {
            chunk_index: self.entries.len(),
            content: content.into(),
            vector,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank chunks by cosine similarity to `query`.
    ///
    /// This is a brute-force scan, which is plenty for one source's chunks.
    pub fn search(&self, query: &[f32], limit: usize, min_similarity: f32) -> Vec<ScoredEntry> {
        let mut results: Vec<ScoredEntry> = self
            .entries
            .iter()
            .map(|entry| ScoredEntry {
                chunk_index: entry.chunk_index,
                content: entry.content.clone(),
                similarity: cosine_similarity(query, &entry.vector),
            })
            .filter(|scored| scored.similarity >= min_similarity)
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);
        results
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

/// Directory holding one vector index file per identifier.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    /// Open (and create if needed) an index directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> DbResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        debug!("Using index store at: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, identifier: &str) -> DbResult<PathBuf> {
        if !is_valid_identifier(identifier) {
            return Err(DbError::InvalidIdentifier(identifier.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", identifier)))
    }

    /// Write an index, replacing any previous one atomically.
    pub fn save(&self, index: &VectorIndex) -> DbResult<()> {
        let path = self.path_for(&index.identifier)?;
        let temp = self.write_temp(index)?;
        temp.persist(&path).map_err(|e| DbError::Io(e.error))?;

        info!(
            "Saved index {} ({} chunks, {} dimensions)",
            index.identifier,
            index.len(),
            index.dimensions
        );
        Ok(())
    }

    /// Write an index only if none exists for its identifier yet.
    ///
    /// Returns `false`, leaving the existing file untouched, when another
    /// index got there first.
    pub fn create(&self, index: &VectorIndex) -> DbResult<bool> {
        let path = self.path_for(&index.identifier)?;
        let temp = self.write_temp(index)?;
        match temp.persist_noclobber(&path) {
            Ok(_) => {
                info!("Created index {} ({} chunks)", index.identifier, index.len());
                Ok(true)
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("Index {} already exists", index.identifier);
                Ok(false)
            }
            Err(e) => Err(DbError::Io(e.error)),
        }
    }

    fn write_temp(&self, index: &VectorIndex) -> DbResult<NamedTempFile> {
        let temp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, index)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        Ok(temp)
    }

    /// Load the index for an identifier.
    pub fn load(&self, identifier: &str) -> DbResult<VectorIndex> {
        let path = self.path_for(identifier)?;
        if !path.exists() {
            return Err(DbError::NotFound(format!("Index not found: {}", identifier)));
        }

        let reader = BufReader::new(File::open(&path)?);
        let index: VectorIndex = serde_json::from_reader(reader)?;
        Ok(index)
    }

    pub fn exists(&self, identifier: &str) -> bool {
        self.path_for(identifier)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    /// Remove an index. Returns whether there was one to remove.
    pub fn remove(&self, identifier: &str) -> DbResult<bool> {
        let path = self.path_for(identifier)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed index {}", identifier);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DbError::Io(e)),
        }
    }

    /// Identifiers of every stored index.
    pub fn list(&self) -> DbResult<Vec<String>> {
        let mut identifiers = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_identifier(stem) {
                    identifiers.push(stem.to_string());
                }
            }
        }
        identifiers.sort();
        Ok(identifiers)
    }
}
