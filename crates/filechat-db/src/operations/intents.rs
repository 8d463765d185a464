//! Intent log operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use filechat_core::{Intent, IntentOperation, IntentStatus};
use rusqlite::params;

impl Database {
    /// Record an intent before touching the registry or the index store.
    pub fn begin_intent(&self, intent: &Intent) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO intents (id, identifier, operation, status, error, created_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                intent.id,
                intent.identifier,
                intent.operation.as_str(),
                intent.status.as_str(),
                intent.error,
                intent.created_at.to_rfc3339(),
                intent.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Get an intent by ID.
    pub fn get_intent(&self, id: &str) -> DbResult<Intent> {
        let conn = self.conn()?;
        let intent = conn
            .query_row(
                "SELECT id, identifier, operation, status, error, created_at, completed_at
                 FROM intents WHERE id = ?1",
                params![id],
                row_to_intent,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("Intent not found: {}", id))
                }
                _ => DbError::from(e),
            })?;

        Ok(intent)
    }

    /// Mark an intent as committed.
    pub fn commit_intent(&self, id: &str) -> DbResult<()> {
        self.finish_intent(id, IntentStatus::Committed, None)
    }

    /// Mark an intent as rolled back, keeping the reason.
    pub fn roll_back_intent(&self, id: &str, error: &str) -> DbResult<()> {
        self.finish_intent(id, IntentStatus::RolledBack, Some(error))
    }

    fn finish_intent(&self, id: &str, status: IntentStatus, error: Option<&str>) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE intents SET status = ?2, error = ?3, completed_at = ?4 WHERE id = ?1",
            params![id, status.as_str(), error, now],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Intent not found: {}", id)));
        }

        Ok(())
    }

    /// Intents that were started but never finished, oldest first.
    pub fn pending_intents(&self) -> DbResult<Vec<Intent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, identifier, operation, status, error, created_at, completed_at
             FROM intents WHERE status = 'pending' ORDER BY created_at ASC",
        )?;

        let intents = stmt.query_map([], row_to_intent)?;
        intents.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Remove finished intents older than `before`.
    pub fn prune_intents(&self, before: DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM intents WHERE status != 'pending' AND completed_at < ?1",
            params![before.to_rfc3339()],
        )?;
        Ok(rows)
    }
}

fn row_to_intent(row: &rusqlite::Row) -> rusqlite::Result<Intent> {
    let operation_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(5)?;
    let completed_at_str: Option<String> = row.get(6)?;

    Ok(Intent {
        id: row.get(0)?,
        identifier: row.get(1)?,
        operation: IntentOperation::from_str(&operation_str).unwrap_or(IntentOperation::Write),
        status: IntentStatus::from_str(&status_str).unwrap_or_default(),
        error: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        completed_at: completed_at_str.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        }),
    })
}
