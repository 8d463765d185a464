//! CLI command implementations.

pub mod chat;
pub mod config;
pub mod delete;
pub mod describe;
pub mod init;
pub mod list;
pub mod recover;
pub mod session;
pub mod shell;
pub mod show;
pub mod status;
pub mod upload;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use filechat_config::{AppPaths, Config};
use filechat_core::{FileRecord, Session};
use filechat_db::Database;
use filechat_ingest::{Library, OllamaBackend, StandardLoader};
use tokio::runtime::Runtime;
use tracing::debug;

/// The library as wired up for the command line.
pub type CliLibrary = Library<StandardLoader, OllamaBackend>;

/// Get the platform application paths, before any config override.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Everything a command needs once filechat is initialized.
pub struct Context {
    pub paths: AppPaths,
    pub config: Config,
    pub library: CliLibrary,
    runtime: Runtime,
}

impl Context {
    /// Load config, resolve paths and open the library.
    pub fn open() -> Result<Self> {
        let base = get_paths()?;
        if !base.config_file.exists() {
            anyhow::bail!("Filechat is not initialized. Run 'filechat init' first.");
        }

        let config = Config::load_from(&base.config_file).context("Failed to load config")?;
        if !config.ui.color {
            colored::control::set_override(false);
        }

        let paths = base
            .apply_config(&config)
            .context("Failed to resolve data directory")?;
        if !paths.is_initialized() {
            anyhow::bail!(
                "No database at {}. Run 'filechat init' first.",
                paths.database_file.display()
            );
        }

        debug!("Using data directory {}", paths.data_dir.display());
        let db = Database::open(&paths.database_file).context("Failed to open database")?;
        let library = Library::open(db, &config, &paths).context("Failed to open library")?;
        let runtime = Runtime::new().context("Failed to create async runtime")?;

        Ok(Self {
            paths,
            config,
            library,
            runtime,
        })
    }

    pub fn db(&self) -> &Database {
        self.library.database()
    }

    /// Run a future to completion on the command's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn load_session(&self, name: &str) -> Result<Session> {
        self.db()
            .load_session(name, &self.config.general.default_owner)
            .with_context(|| format!("Failed to load session '{}'", name))
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.db()
            .save_session(session)
            .with_context(|| format!("Failed to save session '{}'", session.name))
    }

    /// Settle anything an interrupted run left behind. Called before every
    /// command that writes to the library.
    pub fn recover_pending(&self) -> Result<()> {
        let report = self
            .library
            .recover()
            .context("Failed to recover interrupted operations")?;

        if !report.is_empty() {
            println!(
                "{} Recovered interrupted operations ({} committed, {} rolled back, {} deletes finished)",
                "Note:".yellow().bold(),
                report.committed,
                report.rolled_back,
                report.deletes_completed
            );
        }
        Ok(())
    }

    /// The record chosen in `session`.
    pub fn selected_file(&self, session: &Session) -> Result<FileRecord> {
        let identifier = session
            .selected_identifier()
            .context("No file chosen. Run 'filechat choose <collection> <file>' first.")?;

        self.library
            .record(&identifier)?
            .with_context(|| {
                format!(
                    "The chosen file '{}' no longer exists. Choose another one.",
                    session.file.as_deref().unwrap_or_default()
                )
            })
    }

    pub fn format_date(&self, date: &DateTime<Utc>) -> String {
        date.format(&self.config.ui.date_format).to_string()
    }
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// First `max` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}
