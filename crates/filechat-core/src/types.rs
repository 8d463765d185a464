//! Core domain types for Filechat.

use crate::error::{Error, Result};
use crate::identifier::{derive_identifier, MAX_IDENTIFIER_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Identifier shared by a registry row and its vector index.
pub type Identifier = String;

/// Unique identifier for intents.
pub type IntentId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Where an ingested source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Uploaded document (text, markdown, PDF, HTML, code).
    Document,
    /// Uploaded audio or video file.
    Media,
    /// Web page link.
    Link,
    /// Streaming video link.
    VideoLink,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::Media => "media",
            SourceKind::Link => "link",
            SourceKind::VideoLink => "video_link",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" => Some(SourceKind::Document),
            "media" => Some(SourceKind::Media),
            "link" => Some(SourceKind::Link),
            "video_link" => Some(SourceKind::VideoLink),
            _ => None,
        }
    }

    /// Classify an uploaded file by its extension.
    pub fn for_path(path: &Path) -> Self {
        let is_media = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| is_audio_extension(ext) || is_video_extension(ext))
            .unwrap_or(false);

        if is_media {
            SourceKind::Media
        } else {
            SourceKind::Document
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audio formats that can be transcribed directly.
pub fn is_audio_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "mp3" | "wav" | "m4a" | "flac" | "ogg" | "aac" | "opus" | "wma"
    )
}

/// Video formats that need their audio track extracted first.
pub fn is_video_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "mp4" | "mov" | "mkv" | "webm" | "avi" | "m4v"
    )
}

/// One ingested artifact in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub identifier: Identifier,
    pub owner: String,
    pub collection_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub source_kind: SourceKind,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Create a record whose identifier is derived from owner, collection and name.
    pub fn new(
        owner: impl Into<String>,
        collection_name: impl Into<String>,
        display_name: impl Into<String>,
        source_kind: SourceKind,
    ) -> Self {
        let owner = owner.into();
        let collection_name = collection_name.into();
        let display_name = display_name.into();
        Self {
            identifier: derive_identifier(&owner, &collection_name, &display_name),
            owner,
            collection_name,
            display_name,
            description: None,
            content: None,
            source_kind,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Reject blank owner, collection or display name.
    pub fn validate(&self) -> Result<()> {
        validate_names(&self.owner, &self.collection_name, &self.display_name)
    }
}

/// Check the parts an identifier is derived from.
///
/// Derivation itself never fails, but a blank part would make two different
/// submissions collapse onto the same identifier shape.
pub fn validate_names(owner: &str, collection: &str, name: &str) -> Result<()> {
    for (field, value) in [("owner", owner), ("collection", collection), ("name", name)] {
        if value.trim().is_empty() {
            return Err(Error::InvalidInput(format!("{} must not be empty", field)));
        }
    }

    let len = derive_identifier(owner, collection, name).len();
    if len > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidInput(format!(
            "owner, collection and name are too long together ({} of {} characters)",
            len, MAX_IDENTIFIER_LEN
        )));
    }
    Ok(())
}

/// A mutable attribute of a [`FileRecord`].
///
/// Owner, collection and display name are not listed because the identifier
/// is derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAttribute {
    Description(Option<String>),
    Content(Option<String>),
}

impl FileAttribute {
    /// Column the attribute is stored in.
    pub fn column(&self) -> &'static str {
        match self {
            FileAttribute::Description(_) => "description",
            FileAttribute::Content(_) => "content",
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            FileAttribute::Description(v) | FileAttribute::Content(v) => v.as_deref(),
        }
    }
}

/// Per-conversation selection of owner, collection and file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub owner: String,
    pub collection: Option<String>,
    pub file: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            collection: None,
            file: None,
            updated_at: Utc::now(),
        }
    }

    /// Switch owner. The previous file selection belonged to the old owner.
    pub fn choose_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
        self.collection = None;
        self.file = None;
        self.updated_at = Utc::now();
    }

    pub fn choose_file(&mut self, collection: impl Into<String>, file: impl Into<String>) {
        self.collection = Some(collection.into());
        self.file = Some(file.into());
        self.updated_at = Utc::now();
    }

    pub fn clear_selection(&mut self) {
        self.collection = None;
        self.file = None;
        self.updated_at = Utc::now();
    }

    /// Identifier of the chosen file, if one is selected.
    pub fn selected_identifier(&self) -> Option<Identifier> {
        match (&self.collection, &self.file) {
            (Some(collection), Some(file)) => {
                Some(derive_identifier(&self.owner, collection, file))
            }
            _ => None,
        }
    }
}

/// Which dual write an intent guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentOperation {
    Write,
    Delete,
}

impl IntentOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentOperation::Write => "write",
            IntentOperation::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "write" => Some(IntentOperation::Write),
            "delete" => Some(IntentOperation::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    #[default]
    Pending,
    Committed,
    RolledBack,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Committed => "committed",
            IntentStatus::RolledBack => "rolled_back",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(IntentStatus::Pending),
            "committed" => Some(IntentStatus::Committed),
            "rolled_back" => Some(IntentStatus::RolledBack),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Write-ahead record of a registry + vector index operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    pub identifier: Identifier,
    pub operation: IntentOperation,
    pub status: IntentStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Intent {
    pub fn new(identifier: impl Into<String>, operation: IntentOperation) -> Self {
        Self {
            id: new_id(),
            identifier: identifier.into(),
            operation,
            status: IntentStatus::Pending,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn write(identifier: impl Into<String>) -> Self {
        Self::new(identifier, IntentOperation::Write)
    }

    pub fn delete(identifier: impl Into<String>) -> Self {
        Self::new(identifier, IntentOperation::Delete)
    }
}

/// Statistics about the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_files: i64,
    pub files_by_kind: std::collections::HashMap<String, i64>,
    pub total_owners: i64,
    pub total_collections: i64,
    pub total_sessions: i64,
    pub pending_intents: i64,
    pub database_size_bytes: i64,
}
