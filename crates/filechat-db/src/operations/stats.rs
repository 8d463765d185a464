//! Registry statistics.

use crate::database::Database;
use crate::error::DbResult;
use filechat_core::RegistryStats;
use std::collections::HashMap;

impl Database {
    /// Get registry statistics.
    pub fn get_stats(&self) -> DbResult<RegistryStats> {
        let conn = self.conn()?;

        let total_files: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;

        let mut files_by_kind = HashMap::new();
        {
            let mut stmt =
                conn.prepare("SELECT source_kind, COUNT(*) FROM files GROUP BY source_kind")?;
            let rows = stmt.query_map([], |row| {
                let kind: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((kind, count))
            })?;
            for row in rows {
                let (kind, count) = row?;
                files_by_kind.insert(kind, count);
            }
        }

        let total_owners: i64 =
            conn.query_row("SELECT COUNT(DISTINCT owner) FROM files", [], |row| row.get(0))?;

        let total_collections: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT owner, collection_name FROM files)",
            [],
            |row| row.get(0),
        )?;

        let total_sessions: i64 =
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;

        let pending_intents: i64 = conn.query_row(
            "SELECT COUNT(*) FROM intents WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )?;

        Ok(RegistryStats {
            total_files,
            files_by_kind,
            total_owners,
            total_collections,
            total_sessions,
            pending_intents,
            database_size_bytes: 0,
        })
    }
}
