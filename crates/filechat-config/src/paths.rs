//! Application paths management.

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    /// One vector index per identifier.
    pub index_dir: PathBuf,
    /// Scratch space for uploads while they are being ingested.
    pub upload_dir: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "filechat", "filechat")?;

        Some(Self::with_dirs(
            proj_dirs.config_dir().to_path_buf(),
            proj_dirs.data_dir().to_path_buf(),
        ))
    }

    /// Keep everything (config included) under a single root directory.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::with_dirs(root.to_path_buf(), root.to_path_buf())
    }

    fn with_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            database_file: data_dir.join("filechat.db"),
            index_dir: data_dir.join("datastore"),
            upload_dir: data_dir.join("files"),
            config_dir,
            data_dir,
        }
    }

    /// Apply the `general.data_dir` override from a loaded config.
    pub fn apply_config(self, config: &Config) -> ConfigResult<Self> {
        let Some(data_dir) = config.general.data_dir.as_deref() else {
            return Ok(self);
        };

        let expanded = shellexpand::full(data_dir).map_err(|e| ConfigError::PathExpansion {
            path: data_dir.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::with_dirs(self.config_dir, PathBuf::from(expanded.as_ref())))
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.index_dir)?;
        std::fs::create_dir_all(&self.upload_dir)?;
        Ok(())
    }

    /// Check if filechat has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}
