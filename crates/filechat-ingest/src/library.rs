//! The library: ingestion, retrieval and the registry kept in step.
//!
//! Every submission writes two things under one identifier, a vector index
//! file and a registry row. The pair is guarded by an intent record:
//!
//! 1. begin a `write` intent
//! 2. chunk, embed and save the index (atomic rename)
//! 3. insert the registry row
//! 4. commit the intent
//!
//! A failure in 2-3 removes the index this submission wrote and rolls the
//! intent back. An index another submission wrote first is left alone. A crash
//! leaves the intent pending, and [`Library::recover`] settles it later.

use crate::backend::{ModelBackend, OllamaBackend};
use crate::chunker::{ChunkConfig, Chunker};
use crate::error::{IngestError, IngestResult};
use crate::loader::{classify_link, validate_link, LinkKind, LoadedSource, LoaderConfig, SourceLoader, StandardLoader};
use filechat_config::{AppPaths, Config};
use filechat_core::{
    derive_identifier, validate_names, FileAttribute, FileRecord, Identifier, Intent,
    IntentOperation, SourceKind,
};
use filechat_db::{CreateOutcome, Database, DbError, IndexStore, VectorIndex};
use filechat_ollama::{ChatTurn, ContextItem, SourceReference};
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Ingested, indexed and registered.
    Stored(FileRecord),
    /// A record with this identifier already exists; nothing was touched.
    AlreadyExists(Identifier),
}

/// An answer with the chunks it was based on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceReference>,
}

/// What [`Library::recover`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Writes whose row made it in; the intent was only missing its commit.
    pub committed: usize,
    /// Writes without a row; their index was removed.
    pub rolled_back: usize,
    /// Deletes finished on both sides.
    pub deletes_completed: usize,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.committed == 0 && self.rolled_back == 0 && self.deletes_completed == 0
    }
}

/// Retrieval settings.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub max_context_chunks: usize,
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context_chunks: 4,
            min_similarity: 0.0,
        }
    }
}

/// Façade over the registry, the index store and the two backends.
pub struct Library<L, M> {
    db: Database,
    indexes: IndexStore,
    loader: L,
    model: M,
    chunker: Chunker,
    retrieval: RetrievalConfig,
}

impl Library<StandardLoader, OllamaBackend> {
    /// Build the library used by the CLI from config and resolved paths.
    pub fn open(db: Database, config: &Config, paths: &AppPaths) -> IngestResult<Self> {
        let indexes = IndexStore::open(&paths.index_dir)?;
        let loader = StandardLoader::new(LoaderConfig::from_config(config, &paths.upload_dir))?;
        let model = OllamaBackend::from_config(config)?;

        Ok(Self::new(db, indexes, loader, model)
            .with_chunker(Chunker::new(ChunkConfig::from_processing_config(
                &config.processing,
            )))
            .with_retrieval(RetrievalConfig {
                max_context_chunks: config.chat.max_context_chunks,
                min_similarity: config.chat.min_similarity,
            }))
    }
}

impl<L: SourceLoader, M: ModelBackend> Library<L, M> {
    pub fn new(db: Database, indexes: IndexStore, loader: L, model: M) -> Self {
        Self {
            db,
            indexes,
            loader,
            model,
            chunker: Chunker::new(ChunkConfig::default()),
            retrieval: RetrievalConfig::default(),
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn indexes(&self) -> &IndexStore {
        &self.indexes
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Ingest an uploaded file. The display name defaults to the file name.
    pub async fn submit_file(
        &self,
        owner: &str,
        collection: &str,
        path: &Path,
        display_name: Option<&str>,
    ) -> IngestResult<SubmitOutcome> {
        let display_name = match display_name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    IngestError::Validation(format!("{} has no file name", path.display()))
                })?,
        };
        validate_names(owner, collection, &display_name)?;

        let record = FileRecord::new(owner, collection, display_name, SourceKind::for_path(path));
        if let Some(outcome) = self.existing(&record.identifier)? {
            return Ok(outcome);
        }

        if !path.is_file() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        info!("Ingesting {} as {}", path.display(), record.identifier);
        let source = match record.source_kind {
            SourceKind::Media => self.loader.load_media(path).await?,
            _ => self.loader.load_document(path).await?,
        };

        self.store(record, source).await
    }

    /// Ingest a web page or online video. The link itself is the display name.
    pub async fn submit_link(
        &self,
        owner: &str,
        collection: &str,
        link: &str,
    ) -> IngestResult<SubmitOutcome> {
        let link = link.trim();
        validate_names(owner, collection, link)?;
        validate_link(link)?;

        let kind = match classify_link(link) {
            LinkKind::Video => SourceKind::VideoLink,
            LinkKind::Page => SourceKind::Link,
        };
        let record = FileRecord::new(owner, collection, link, kind);
        if let Some(outcome) = self.existing(&record.identifier)? {
            return Ok(outcome);
        }

        info!("Ingesting {} as {}", link, record.identifier);
        let source = match kind {
            SourceKind::VideoLink => self.loader.load_video_link(link).await?,
            _ => self.loader.load_link(link).await?,
        };

        self.store(record, source).await
    }

    fn existing(&self, identifier: &str) -> IngestResult<Option<SubmitOutcome>> {
        if self.db.get_file(identifier)?.is_some() {
            debug!("{} is already registered", identifier);
            return Ok(Some(SubmitOutcome::AlreadyExists(identifier.to_string())));
        }
        Ok(None)
    }

    async fn store(&self, mut record: FileRecord, source: LoadedSource) -> IngestResult<SubmitOutcome> {
        let text = source.text.trim();
        if text.is_empty() {
            return Err(IngestError::EmptyContent(record.display_name));
        }
        if record.description.is_none() {
            record.description = source.title.clone();
        }
        record.content = Some(text.to_string());

        let intent = Intent::write(&record.identifier);
        self.db.begin_intent(&intent)?;

        match self.write_index_and_row(&record, text, &intent).await {
            Ok(CreateOutcome::Created) => {
                self.db.commit_intent(&intent.id)?;
                info!("Stored {}", record.identifier);
                Ok(SubmitOutcome::Stored(record))
            }
            Ok(CreateOutcome::AlreadyExists) => {
                // Registered concurrently from the same source; its row and index stay
                self.db.commit_intent(&intent.id)?;
                Ok(SubmitOutcome::AlreadyExists(record.identifier))
            }
            Err(e) => {
                warn!("Ingestion of {} failed: {}", record.identifier, e);
                self.db.roll_back_intent(&intent.id, &e.to_string())?;
                Err(e)
            }
        }
    }

    /// Save the index, then the row. Only an index this call wrote is ever
    /// removed again.
    async fn write_index_and_row(
        &self,
        record: &FileRecord,
        text: &str,
        intent: &Intent,
    ) -> IngestResult<CreateOutcome> {
        let chunks = self.chunker.chunk_text(text);
        if chunks.is_empty() {
            return Err(IngestError::EmptyContent(record.display_name.clone()));
        }

        let mut index = VectorIndex::new(&record.identifier, self.model.embedding_model());
        for chunk in chunks {
            let vector = self.model.embed(&chunk).await?;
            index.push(chunk, vector)?;
        }
        debug!("Embedded {} chunks for {}", index.len(), record.identifier);

        if !self.indexes.create(&index)? {
            if self.db.get_file(&record.identifier)?.is_some()
                || self.written_elsewhere(intent)?
            {
                debug!("{} was indexed concurrently, keeping that index", record.identifier);
                return Ok(CreateOutcome::AlreadyExists);
            }
            // No row and nobody writing it: left over from an unrecorded run
            warn!("Replacing stale index {}", record.identifier);
            self.indexes.save(&index)?;
        }

        match self.db.create_file(record) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(cleanup) = self.indexes.remove(&record.identifier) {
                    warn!("Could not remove index {}: {}", record.identifier, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Whether another pending write intent targets the same identifier.
    fn written_elsewhere(&self, intent: &Intent) -> IngestResult<bool> {
        Ok(self.db.pending_intents()?.iter().any(|other| {
            other.id != intent.id
                && other.identifier == intent.identifier
                && other.operation == IntentOperation::Write
        }))
    }

    /// Answer a question from the index of `identifier`.
    pub async fn answer(
        &self,
        identifier: &str,
        question: &str,
        history: &[ChatTurn],
    ) -> IngestResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(IngestError::Validation("question must not be empty".to_string()));
        }

        let record = self
            .db
            .get_file(identifier)?
            .ok_or_else(|| IngestError::NotFound(identifier.to_string()))?;
        let index = self.indexes.load(identifier).map_err(not_found)?;

        if index.embedding_model != self.model.embedding_model() {
            warn!(
                "{} was indexed with {} but questions are embedded with {}",
                identifier,
                index.embedding_model,
                self.model.embedding_model()
            );
        }

        let query = self.model.embed(question).await?;
        let context: Vec<ContextItem> = index
            .search(
                &query,
                self.retrieval.max_context_chunks,
                self.retrieval.min_similarity,
            )
            .into_iter()
            .map(|hit| ContextItem {
                content: hit.content,
                similarity: hit.similarity,
                source: record.display_name.clone(),
            })
            .collect();
        debug!("Retrieved {} chunks from {}", context.len(), identifier);

        let text = self.model.answer(question, &context, history).await?;

        Ok(Answer {
            text,
            sources: context.iter().map(SourceReference::from_context).collect(),
        })
    }

    /// Delete a record together with its vector index.
    ///
    /// If this fails half way the intent stays pending and
    /// [`Library::recover`] finishes the job.
    pub async fn remove(
        &self,
        owner: &str,
        collection: &str,
        display_name: &str,
    ) -> IngestResult<FileRecord> {
        validate_names(owner, collection, display_name)?;
        let identifier = derive_identifier(owner, collection, display_name);

        let record = self
            .db
            .get_file(&identifier)?
            .ok_or_else(|| IngestError::NotFound(identifier.clone()))?;

        let intent = Intent::delete(&identifier);
        self.db.begin_intent(&intent)?;

        if !self.indexes.remove(&identifier)? {
            warn!("{} had no vector index", identifier);
        }
        self.db.delete_file(&identifier).map_err(not_found)?;
        self.db.commit_intent(&intent.id)?;

        info!("Removed {}", identifier);
        Ok(record)
    }

    /// Set or clear the description of a record.
    pub fn describe(&self, identifier: &str, description: Option<String>) -> IngestResult<()> {
        self.db
            .update_file(identifier, &[FileAttribute::Description(description)])
            .map_err(not_found)
    }

    /// Settle intents left pending by an interrupted process.
    pub fn recover(&self) -> IngestResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for intent in self.db.pending_intents()? {
            match intent.operation {
                IntentOperation::Write => {
                    if self.db.get_file(&intent.identifier)?.is_some() {
                        self.db.commit_intent(&intent.id)?;
                        report.committed += 1;
                    } else {
                        self.indexes.remove(&intent.identifier)?;
                        self.db
                            .roll_back_intent(&intent.id, "interrupted before registration")?;
                        report.rolled_back += 1;
                    }
                }
                IntentOperation::Delete => {
                    self.indexes.remove(&intent.identifier)?;
                    match self.db.delete_file(&intent.identifier) {
                        Ok(()) | Err(DbError::NotFound(_)) => {}
                        Err(e) => return Err(e.into()),
                    }
                    self.db.commit_intent(&intent.id)?;
                    report.deletes_completed += 1;
                }
            }
            debug!("Recovered {} intent for {}", intent.operation.as_str(), intent.identifier);
        }

        if !report.is_empty() {
            info!("Recovery: {:?}", report);
        }
        Ok(report)
    }

    pub fn record(&self, identifier: &str) -> IngestResult<Option<FileRecord>> {
        Ok(self.db.get_file(identifier)?)
    }

    pub fn files_for_owner(&self, owner: &str) -> IngestResult<Vec<FileRecord>> {
        Ok(self.db.list_files_for_owner(owner)?)
    }

    pub fn files_in_collection(&self, owner: &str, collection: &str) -> IngestResult<Vec<FileRecord>> {
        Ok(self.db.list_files_in_collection(owner, collection)?)
    }

    pub fn collections_for_owner(&self, owner: &str) -> IngestResult<Vec<String>> {
        Ok(self.db.list_collections_for_owner(owner)?)
    }

    /// The last `limit` turns a session had about a file, oldest first.
    pub fn chat_history(
        &self,
        session_name: &str,
        identifier: &str,
        limit: usize,
    ) -> IngestResult<Vec<ChatTurn>> {
        Ok(self
            .db
            .recent_chat_turns(session_name, identifier, limit)?
            .into_iter()
            .map(|turn| ChatTurn::new(turn.question, turn.answer))
            .collect())
    }

    pub fn remember_turn(&self, session_name: &str, identifier: &str, turn: &ChatTurn) -> IngestResult<()> {
        Ok(self
            .db
            .append_chat_turn(session_name, identifier, &turn.question, &turn.answer)?)
    }

    /// Forget the chat history of a session. Returns how many turns went.
    pub fn forget_history(&self, session_name: &str) -> IngestResult<usize> {
        Ok(self.db.clear_chat_turns(session_name)?)
    }
}

fn not_found(err: DbError) -> IngestError {
    match err {
        DbError::NotFound(what) => IngestError::NotFound(what),
        other => IngestError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filechat_core::IntentStatus;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct FakeLoader {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLoader {
        fn with_page(mut self, url: &str, text: &str) -> Self {
            self.pages.insert(url.to_string(), text.to_string());
            self
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn page(&self, url: &str) -> IngestResult<LoadedSource> {
            self.pages
                .get(url)
                .map(|text| LoadedSource::new(text.clone()).with_title("Fake page"))
                .ok_or_else(|| IngestError::Fetch {
                    url: url.to_string(),
                    message: "HTTP 404".to_string(),
                })
        }
    }

    impl SourceLoader for FakeLoader {
        async fn load_document(&self, path: &Path) -> IngestResult<LoadedSource> {
            self.record(format!("document:{}", path.display()));
            Ok(LoadedSource::new(std::fs::read_to_string(path)?))
        }

        async fn load_media(&self, path: &Path) -> IngestResult<LoadedSource> {
            self.record(format!("media:{}", path.display()));
            Ok(LoadedSource::new("transcribed lecture about enzymes"))
        }

        async fn load_link(&self, url: &str) -> IngestResult<LoadedSource> {
            self.record(format!("link:{}", url));
            self.page(url)
        }

        async fn load_video_link(&self, url: &str) -> IngestResult<LoadedSource> {
            self.record(format!("video:{}", url));
            Ok(LoadedSource::new("video subtitles about cells"))
        }
    }

    /// Letter-frequency embeddings and an answer that echoes its context.
    #[derive(Default)]
    struct FakeModel {
        fail_embeddings_after: Option<usize>,
        embedded: AtomicUsize,
    }

    impl ModelBackend for FakeModel {
        fn embedding_model(&self) -> &str {
            "fake-embed"
        }

        async fn embed(&self, text: &str) -> IngestResult<Vec<f32>> {
            let n = self.embedded.fetch_add(1, Ordering::SeqCst);
            if self.fail_embeddings_after.is_some_and(|limit| n >= limit) {
                return Err(IngestError::Backend("embedding service down".to_string()));
            }

            let mut vector = vec![0.0f32; 26];
            for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                vector[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(vector)
        }

        async fn answer(
            &self,
            question: &str,
            context: &[ContextItem],
            history: &[ChatTurn],
        ) -> IngestResult<String> {
            match context.first() {
                Some(best) => Ok(format!(
                    "{} [{} chunks, {} turns]: {}",
                    question,
                    context.len(),
                    history.len(),
                    best.content
                )),
                None => Ok("I don't know".to_string()),
            }
        }
    }

    fn library(dir: &TempDir, loader: FakeLoader, model: FakeModel) -> Library<FakeLoader, FakeModel> {
        let db = Database::open(dir.path().join("filechat.db")).unwrap();
        let indexes = IndexStore::open(dir.path().join("datastore")).unwrap();
        Library::new(db, indexes, loader, model).with_chunker(Chunker::new(ChunkConfig {
            chunk_size: 40,
            chunk_overlap: 0,
        }))
    }

    const PAGE: &str = "http://example.com/page";
    const PAGE_TEXT: &str = "Mitochondria produce energy. Ribosomes build proteins. \
                             Chloroplasts capture sunlight in plants.";

    #[tokio::test]
    async fn test_alice_submits_a_link() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());

        let outcome = lib.submit_link("alice", "biology", PAGE).await.unwrap();
        let SubmitOutcome::Stored(record) = outcome else {
            panic!("expected Stored, got {:?}", outcome);
        };
        assert_eq!(record.identifier, "alice_biology_http___example_com_page");
        assert_eq!(record.source_kind, SourceKind::Link);
        assert_eq!(record.description.as_deref(), Some("Fake page"));

        let files = lib.files_for_owner("alice").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].identifier, "alice_biology_http___example_com_page");
        assert_eq!(files[0].collection_name, "biology");

        let index = lib.indexes().load(&record.identifier).unwrap();
        assert!(index.len() >= 2);
        assert_eq!(index.embedding_model, "fake-embed");

        assert!(lib.database().pending_intents().unwrap().is_empty());
        assert_eq!(lib.collections_for_owner("alice").unwrap(), vec!["biology".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_not_reingested() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());

        lib.submit_link("alice", "biology", PAGE).await.unwrap();
        let before = lib.indexes().load("alice_biology_http___example_com_page").unwrap();

        let outcome = lib.submit_link("alice", "biology", PAGE).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::AlreadyExists("alice_biology_http___example_com_page".to_string())
        );

        assert_eq!(lib.loader.calls().len(), 1);
        let after = lib.indexes().load("alice_biology_http___example_com_page").unwrap();
        assert_eq!(before.created_at, after.created_at);
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let model = FakeModel {
            fail_embeddings_after: Some(1),
            ..FakeModel::default()
        };
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), model);

        let result = lib.submit_link("alice", "biology", PAGE).await;
        assert!(matches!(result, Err(IngestError::Backend(_))));

        let identifier = "alice_biology_http___example_com_page";
        assert!(lib.record(identifier).unwrap().is_none());
        assert!(!lib.indexes().exists(identifier));
        assert!(lib.database().pending_intents().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loader_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default(), FakeModel::default());

        let result = lib.submit_link("alice", "biology", "http://example.com/missing").await;
        assert!(matches!(result, Err(IngestError::Fetch { .. })));
        assert!(lib.files_for_owner("alice").unwrap().is_empty());
        assert!(lib.indexes().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default(), FakeModel::default());

        assert!(matches!(
            lib.submit_link("alice", "  ", PAGE).await,
            Err(IngestError::Validation(_))
        ));
        assert!(matches!(
            lib.submit_link("alice", "biology", "not a url").await,
            Err(IngestError::Validation(_))
        ));
        assert!(lib.loader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_link_is_rejected_before_loading() {
        let dir = tempdir().unwrap();
        let long_link = format!("http://example.com/{}", "a".repeat(300));
        let lib = library(
            &dir,
            FakeLoader::default().with_page(&long_link, PAGE_TEXT),
            FakeModel::default(),
        );

        assert!(matches!(
            lib.submit_link("alice", "biology", &long_link).await,
            Err(IngestError::Validation(_))
        ));
        assert!(lib.loader.calls().is_empty());
        assert_eq!(lib.model.embedded.load(Ordering::SeqCst), 0);
        assert!(lib.database().pending_intents().unwrap().is_empty());
        assert!(lib.indexes().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_and_media_routing() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default(), FakeModel::default());

        let outcome = lib
            .submit_link("bob", "lectures", "https://youtu.be/abc123")
            .await
            .unwrap();
        let SubmitOutcome::Stored(video) = outcome else {
            panic!("expected Stored");
        };
        assert_eq!(video.source_kind, SourceKind::VideoLink);
        assert_eq!(video.display_name, "https://youtu.be/abc123");

        let audio = dir.path().join("lecture.mp3");
        std::fs::write(&audio, b"not really audio").unwrap();
        let outcome = lib.submit_file("bob", "lectures", &audio, None).await.unwrap();
        let SubmitOutcome::Stored(media) = outcome else {
            panic!("expected Stored");
        };
        assert_eq!(media.source_kind, SourceKind::Media);
        assert_eq!(media.identifier, "bob_lectures_lecture_mp3");

        let calls = lib.loader.calls();
        assert!(calls[0].starts_with("video:"));
        assert!(calls[1].starts_with("media:"));
    }

    #[tokio::test]
    async fn test_submit_document_with_display_name() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default(), FakeModel::default());

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Enzymes lower activation energy.").unwrap();

        let outcome = lib
            .submit_file("alice", "chem", &path, Some("Week 1 notes"))
            .await
            .unwrap();
        let SubmitOutcome::Stored(record) = outcome else {
            panic!("expected Stored");
        };
        assert_eq!(record.identifier, "alice_chem_Week_1_notes");
        assert_eq!(record.content.as_deref(), Some("Enzymes lower activation energy."));

        let missing = lib
            .submit_file("alice", "chem", &dir.path().join("gone.txt"), None)
            .await;
        assert!(matches!(missing, Err(IngestError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writer_keeps_its_index() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());
        let identifier = "alice_biology_http___example_com_page";

        // Another submission of the same page has saved its index but not yet its row
        let winner = Intent::write(identifier);
        lib.database().begin_intent(&winner).unwrap();
        let mut index = VectorIndex::new(identifier, "fake-embed");
        index.push("winner chunk", vec![1.0, 0.0]).unwrap();
        lib.indexes().save(&index).unwrap();

        let outcome = lib.submit_link("alice", "biology", PAGE).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::AlreadyExists(identifier.to_string()));

        let kept = lib.indexes().load(identifier).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.entries[0].content, "winner chunk");

        let pending = lib.database().pending_intents().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, winner.id);
    }

    #[tokio::test]
    async fn test_stale_index_is_replaced() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());
        let identifier = "alice_biology_http___example_com_page";

        let mut stale = VectorIndex::new(identifier, "old-embed");
        stale.push("stale chunk", vec![1.0]).unwrap();
        lib.indexes().save(&stale).unwrap();

        let outcome = lib.submit_link("alice", "biology", PAGE).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Stored(_)));

        let index = lib.indexes().load(identifier).unwrap();
        assert_eq!(index.embedding_model, "fake-embed");
        assert!(index.len() > 1);
        assert!(lib.record(identifier).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, "   "), FakeModel::default());

        let result = lib.submit_link("alice", "biology", PAGE).await;
        assert!(matches!(result, Err(IngestError::EmptyContent(_))));
        assert!(lib.database().pending_intents().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_uses_closest_chunks() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default())
            .with_retrieval(RetrievalConfig {
                max_context_chunks: 1,
                min_similarity: 0.0,
            });
        lib.submit_link("alice", "biology", PAGE).await.unwrap();

        let history = vec![ChatTurn::new("hi", "hello")];
        let answer = lib
            .answer("alice_biology_http___example_com_page", "Ribosomes build proteins?", &history)
            .await
            .unwrap();

        assert!(answer.text.contains("[1 chunks, 1 turns]"));
        assert!(answer.text.contains("Ribosomes build proteins."));
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].source, PAGE);

        assert!(matches!(
            lib.answer("alice_biology_nothing", "anything?", &[]).await,
            Err(IngestError::NotFound(_))
        ));
        assert!(matches!(
            lib.answer("alice_biology_http___example_com_page", "  ", &[]).await,
            Err(IngestError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_history_follows_the_session() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());
        lib.submit_link("alice", "biology", PAGE).await.unwrap();
        let identifier = "alice_biology_http___example_com_page";

        // Two separate invocations of the same session
        for question in ["What do ribosomes do?", "And mitochondria?"] {
            let history = lib.chat_history("default", identifier, 5).unwrap();
            let answer = lib.answer(identifier, question, &history).await.unwrap();
            lib.remember_turn("default", identifier, &ChatTurn::new(question, answer.text))
                .unwrap();
        }

        let history = lib.chat_history("default", identifier, 5).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "What do ribosomes do?");
        assert!(history[1].answer.contains("1 turns"));

        assert!(lib.chat_history("other", identifier, 5).unwrap().is_empty());
        assert_eq!(lib.forget_history("default").unwrap(), 2);
        assert!(lib.chat_history("default", identifier, 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_deletes_row_and_index() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());
        lib.submit_link("alice", "biology", PAGE).await.unwrap();

        let removed = lib.remove("alice", "biology", PAGE).await.unwrap();
        assert_eq!(removed.identifier, "alice_biology_http___example_com_page");
        assert!(lib.record(&removed.identifier).unwrap().is_none());
        assert!(!lib.indexes().exists(&removed.identifier));
        assert!(lib.database().pending_intents().unwrap().is_empty());

        assert!(matches!(
            lib.remove("alice", "biology", PAGE).await,
            Err(IngestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_describe() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());
        lib.submit_link("alice", "biology", PAGE).await.unwrap();

        let identifier = "alice_biology_http___example_com_page";
        lib.describe(identifier, Some("Cell organelles".to_string())).unwrap();
        let record = lib.record(identifier).unwrap().unwrap();
        assert_eq!(record.description.as_deref(), Some("Cell organelles"));
        assert_eq!(record.content.as_deref(), Some(PAGE_TEXT));

        assert!(matches!(
            lib.describe("alice_biology_missing", None),
            Err(IngestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_recover_settles_interrupted_intents() {
        let dir = tempdir().unwrap();
        let lib = library(&dir, FakeLoader::default().with_page(PAGE, PAGE_TEXT), FakeModel::default());
        let db = lib.database();

        // Crashed after the index was written but before the row
        let orphan = Intent::write("alice_biology_orphan");
        db.begin_intent(&orphan).unwrap();
        let mut index = VectorIndex::new("alice_biology_orphan", "fake-embed");
        index.push("stray chunk", vec![1.0, 0.0]).unwrap();
        lib.indexes().save(&index).unwrap();

        // Crashed after the row was written but before the commit
        let registered = FileRecord::new("alice", "biology", "kept", SourceKind::Document);
        let almost = Intent::write(&registered.identifier);
        db.begin_intent(&almost).unwrap();
        db.create_file(&registered).unwrap();

        // Crashed in the middle of a delete
        lib.submit_link("alice", "biology", PAGE).await.unwrap();
        let deleting = Intent::delete("alice_biology_http___example_com_page");
        db.begin_intent(&deleting).unwrap();
        lib.indexes().remove("alice_biology_http___example_com_page").unwrap();

        let report = lib.recover().unwrap();
        assert_eq!(
            report,
            RecoveryReport {
                committed: 1,
                rolled_back: 1,
                deletes_completed: 1,
            }
        );

        assert!(!lib.indexes().exists("alice_biology_orphan"));
        assert_eq!(db.get_intent(&orphan.id).unwrap().status, IntentStatus::RolledBack);
        assert_eq!(db.get_intent(&almost.id).unwrap().status, IntentStatus::Committed);
        assert!(lib.record("alice_biology_http___example_com_page").unwrap().is_none());
        assert!(db.pending_intents().unwrap().is_empty());

        assert!(lib.recover().unwrap().is_empty());
    }
}
