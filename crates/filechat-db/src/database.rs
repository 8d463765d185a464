//! Database connection and pool management.

use crate::error::{DbError, DbResult};
use crate::migrations;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use tracing::info;

/// Type alias for connection pool.
pub type ConnectionPool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Handle to the file registry database.
///
/// Connections are pooled, so every operation reuses an open connection
/// when one is idle and only opens a new one otherwise.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open a database at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {}", path.display());

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        {
            let conn = pool.get()?;
            migrations::initialize_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory();

        let pool = Pool::builder()
            .max_size(1) // Memory DB only supports single connection
            .build(manager)?;

        {
            let conn = pool.get()?;
            migrations::initialize_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> DbResult<PooledConn> {
        self.pool.get().map_err(DbError::from)
    }

    /// Get database file size in bytes.
    pub fn file_size<P: AsRef<Path>>(path: P) -> DbResult<i64> {
        let metadata = std::fs::metadata(path)?;
        Ok(metadata.len() as i64)
    }

    /// Run integrity check on the database.
    pub fn integrity_check(&self) -> DbResult<bool> {
        let conn = self.conn()?;
        let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_integrity_check() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.integrity_check().unwrap());
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("filechat.db");

        let db = Database::open(&path).unwrap();
        assert!(db.integrity_check().unwrap());
        assert!(path.exists());
        assert!(Database::file_size(&path).unwrap() > 0);
    }
}
