//! Database migrations and schema management.

use crate::error::DbResult;
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating initial database schema...");
        create_initial_schema(conn)?;
        create_chat_turns(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database from version {} to {}",
            current_version, SCHEMA_VERSION
        );
        if current_version < 2 {
            create_chat_turns(conn)?;
        }
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- Registry of ingested sources
        CREATE TABLE IF NOT EXISTS files (
            identifier TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            collection_name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            description TEXT,
            content TEXT,
            source_kind TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner);
        CREATE INDEX IF NOT EXISTS idx_files_owner_collection ON files(owner, collection_name);

        -- Per-conversation selection state
        CREATE TABLE IF NOT EXISTS sessions (
            name TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            collection_name TEXT,
            display_name TEXT,
            updated_at TEXT NOT NULL
        );

        -- Write-ahead log for registry + vector index operations
        CREATE TABLE IF NOT EXISTS intents (
            id TEXT PRIMARY KEY,
            identifier TEXT NOT NULL,
            operation TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            error TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_intents_status ON intents(status);
        "#,
    )?;

    Ok(())
}

/// Version 2: chat turns kept per session and file.
fn create_chat_turns(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS chat_turns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_name TEXT NOT NULL,
            identifier TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chat_turns_session ON chat_turns(session_name, identifier);
        "#,
    )?;

    Ok(())
}
