//! Chat history persistence.

use crate::database::Database;
use crate::error::DbResult;
use chrono::{DateTime, Utc};
use rusqlite::params;

/// One question and answer exchanged in a session about one file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTurn {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Append a turn to the history of `session_name` about `identifier`.
    pub fn append_chat_turn(
        &self,
        session_name: &str,
        identifier: &str,
        question: &str,
        answer: &str,
    ) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO chat_turns (session_name, identifier, question, answer, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![session_name, identifier, question, answer, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// The last `limit` turns of a session about a file, oldest first.
    pub fn recent_chat_turns(
        &self,
        session_name: &str,
        identifier: &str,
        limit: usize,
    ) -> DbResult<Vec<StoredTurn>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT question, answer, created_at FROM chat_turns
            WHERE session_name = ?1 AND identifier = ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )?;

        let mut turns = stmt
            .query_map(params![session_name, identifier, limit as i64], row_to_turn)?
            .collect::<Result<Vec<_>, _>>()?;
        turns.reverse();

        Ok(turns)
    }

    /// Forget every turn of a session. Returns how many were removed.
    pub fn clear_chat_turns(&self, session_name: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM chat_turns WHERE session_name = ?1",
            params![session_name],
        )?;
        Ok(rows)
    }
}

fn row_to_turn(row: &rusqlite::Row) -> rusqlite::Result<StoredTurn> {
    let created_at_str: String = row.get(2)?;

    Ok(StoredTurn {
        question: row.get(0)?,
        answer: row.get(1)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
