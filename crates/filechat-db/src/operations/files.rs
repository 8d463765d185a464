//! File registry operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use filechat_core::{FileAttribute, FileRecord, SourceKind};
use rusqlite::{ffi, params, OptionalExtension};
use tracing::debug;

const FILE_COLUMNS: &str = "identifier, owner, collection_name, display_name, description, content, source_kind, created_at";

/// Outcome of registering a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record with the same identifier was already registered and was left untouched.
    AlreadyExists,
}

impl Database {
    /// Register a file.
    ///
    /// An identifier collision is reported as [`CreateOutcome::AlreadyExists`];
    /// every other failure is an error.
    pub fn create_file(&self, record: &FileRecord) -> DbResult<CreateOutcome> {
        let conn = self.conn()?;
        let result = conn.execute(
            r#"
            INSERT INTO files (identifier, owner, collection_name, display_name, description, content, source_kind, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.identifier,
                record.owner,
                record.collection_name,
                record.display_name,
                record.description,
                record.content,
                record.source_kind.as_str(),
                record.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                debug!("File already registered: {}", record.identifier);
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Get a file by identifier, `None` when it is not registered.
    pub fn get_file(&self, identifier: &str) -> DbResult<Option<FileRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM files WHERE identifier = ?1", FILE_COLUMNS),
                params![identifier],
                row_to_file,
            )
            .optional()?;

        Ok(record)
    }

    /// Apply every attribute change to a file in one transaction.
    pub fn update_file(&self, identifier: &str, attributes: &[FileAttribute]) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM files WHERE identifier = ?1)",
            params![identifier],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::NotFound(format!("File not found: {}", identifier)));
        }

        for attribute in attributes {
            // Column names come from a closed set, never from input.
            tx.execute(
                &format!("UPDATE files SET {} = ?1 WHERE identifier = ?2", attribute.column()),
                params![attribute.value(), identifier],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete a file by identifier, together with the chat turns about it.
    pub fn delete_file(&self, identifier: &str) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let rows = tx.execute("DELETE FROM files WHERE identifier = ?1", params![identifier])?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("File not found: {}", identifier)));
        }

        tx.execute("DELETE FROM chat_turns WHERE identifier = ?1", params![identifier])?;
        tx.commit()?;
        Ok(())
    }

    /// List every registered file.
    pub fn list_files(&self) -> DbResult<Vec<FileRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files ORDER BY created_at",
            FILE_COLUMNS
        ))?;

        let files = stmt.query_map([], row_to_file)?;
        files.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// List files submitted by an owner.
    pub fn list_files_for_owner(&self, owner: &str) -> DbResult<Vec<FileRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files WHERE owner = ?1 ORDER BY collection_name, display_name",
            FILE_COLUMNS
        ))?;

        let files = stmt.query_map(params![owner], row_to_file)?;
        files.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Distinct collection names used by an owner.
    pub fn list_collections_for_owner(&self, owner: &str) -> DbResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT collection_name FROM files WHERE owner = ?1 ORDER BY collection_name",
        )?;

        let names = stmt.query_map(params![owner], |row| row.get(0))?;
        names.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// List files matching both the owner and the collection.
    pub fn list_files_in_collection(&self, owner: &str, collection: &str) -> DbResult<Vec<FileRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files WHERE owner = ?1 AND collection_name = ?2 ORDER BY display_name",
            FILE_COLUMNS
        ))?;

        let files = stmt.query_map(params![owner, collection], row_to_file)?;
        files.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    let source_kind_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(FileRecord {
        identifier: row.get(0)?,
        owner: row.get(1)?,
        collection_name: row.get(2)?,
        display_name: row.get(3)?,
        description: row.get(4)?,
        content: row.get(5)?,
        source_kind: SourceKind::from_str(&source_kind_str).unwrap_or(SourceKind::Document),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
