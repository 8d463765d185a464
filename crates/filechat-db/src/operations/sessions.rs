//! Session persistence.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use filechat_core::Session;
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Get a session by name.
    pub fn get_session(&self, name: &str) -> DbResult<Option<Session>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT name, owner, collection_name, display_name, updated_at FROM sessions WHERE name = ?1",
                params![name],
                row_to_session,
            )
            .optional()?;

        Ok(session)
    }

    /// Load a session, or start a fresh one for `default_owner`.
    pub fn load_session(&self, name: &str, default_owner: &str) -> DbResult<Session> {
        Ok(self
            .get_session(name)?
            .unwrap_or_else(|| Session::new(name, default_owner)))
    }

    /// Insert or replace a session.
    pub fn save_session(&self, session: &Session) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO sessions (name, owner, collection_name, display_name, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(name) DO UPDATE SET
                owner = excluded.owner,
                collection_name = excluded.collection_name,
                display_name = excluded.display_name,
                updated_at = excluded.updated_at
            "#,
            params![
                session.name,
                session.owner,
                session.collection,
                session.file,
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a session.
    pub fn delete_session(&self, name: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM sessions WHERE name = ?1", params![name])?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Session not found: {}", name)));
        }

        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let updated_at_str: String = row.get(4)?;

    Ok(Session {
        name: row.get(0)?,
        owner: row.get(1)?,
        collection: row.get(2)?,
        file: row.get(3)?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
