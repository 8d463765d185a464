//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub links: LinksConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&paths.config_file)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Reject settings the ingestion and chat pipeline cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.general.default_owner.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "general.default_owner must not be empty".to_string(),
            ));
        }
        if self.processing.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "processing.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.processing.chunk_overlap >= self.processing.chunk_size {
            return Err(ConfigError::Invalid(
                "processing.chunk_overlap must be smaller than processing.chunk_size".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Invalid(
                "chat.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.chat.max_context_chunks == 0 {
            return Err(ConfigError::Invalid(
                "chat.max_context_chunks must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Set a single value by its dotted key, e.g. `ollama.model`.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "general.data_dir" => self.general.data_dir = Some(value.to_string()),
            "general.default_owner" => self.general.default_owner = value.to_string(),
            "ollama.host" => self.ollama.host = value.to_string(),
            "ollama.model" => self.ollama.model = value.to_string(),
            "ollama.embedding_model" => self.ollama.embedding_model = value.to_string(),
            "ollama.timeout_seconds" => self.ollama.timeout_seconds = parse(key, value)?,
            "processing.chunk_size" => self.processing.chunk_size = parse(key, value)?,
            "processing.chunk_overlap" => self.processing.chunk_overlap = parse(key, value)?,
            "processing.whisper_model" => self.processing.whisper_model = value.to_string(),
            "links.fetch_timeout_seconds" => {
                self.links.fetch_timeout_seconds = parse(key, value)?
            }
            "links.max_page_bytes" => self.links.max_page_bytes = parse(key, value)?,
            "links.user_agent" => self.links.user_agent = value.to_string(),
            "chat.temperature" => self.chat.temperature = parse(key, value)?,
            "chat.max_context_chunks" => self.chat.max_context_chunks = parse(key, value)?,
            "chat.min_similarity" => self.chat.min_similarity = parse(key, value)?,
            "chat.history_turns" => self.chat.history_turns = parse(key, value)?,
            "ui.color" => self.ui.color = parse(key, value)?,
            "ui.date_format" => self.ui.date_format = value.to_string(),
            _ => return Err(ConfigError::Invalid(format!("Unknown config key: {}", key))),
        }
        self.validate()
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Filechat Configuration
# Chat with your documents, recordings and web pages

[general]
# Data directory for the registry, vector indexes and uploads
# data_dir = "~/.local/share/filechat"

# Owner selected when a session starts
default_owner = "Generic"

[ollama]
# Ollama server address
host = "http://localhost:11434"

# Model used to answer questions
model = "llama3.1:8b"

# Model for generating embeddings
embedding_model = "nomic-embed-text"

# Request timeout in seconds
timeout_seconds = 120

[processing]
# Text chunking for retrieval (tokens, ~4 characters each)
chunk_size = 375
chunk_overlap = 0

# Whisper model size: tiny, base, small, medium, large
whisper_model = "base"

[links]
# Timeout for fetching a web page (seconds)
fetch_timeout_seconds = 30

# Pages larger than this are cut off before extraction. Larger PDFs are refused
max_page_bytes = 5242880

# Elements dropped before the page text is extracted
strip_elements = ["script", "style", "nav", "header", "footer"]

user_agent = "filechat/0.1"

[chat]
# Sampling temperature for answers
temperature = 0.4

# Chunks retrieved per question
max_context_chunks = 4

# Chunks scoring below this cosine similarity are ignored
min_similarity = 0.0

# Earlier question/answer pairs sent along with a question
history_turns = 5

[ui]
# Enable colored output
color = true

# Date format (strftime)
date_format = "%Y-%m-%d %H:%M"
"#
        .to_string()
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("Invalid value for {}: {}", key, value)))
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
    pub default_owner: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_owner: "Generic".to_string(),
        }
    }
}

/// Ollama LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Content processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub whisper_model: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 375,
            chunk_overlap: 0,
            whisper_model: "base".to_string(),
        }
    }
}

/// Web page fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub fetch_timeout_seconds: u64,
    pub max_page_bytes: usize,
    pub strip_elements: Vec<String>,
    pub user_agent: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_seconds: 30,
            max_page_bytes: 5 * 1024 * 1024,
            strip_elements: ["script", "style", "nav", "header", "footer"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            user_agent: "filechat/0.1".to_string(),
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub temperature: f32,
    pub max_context_chunks: usize,
    pub min_similarity: f32,
    pub history_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_context_chunks: 4,
            min_similarity: 0.0,
            history_turns: 5,
        }
    }
}

/// UI/Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
    pub date_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            color: true,
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.default_owner, "Generic");
        assert_eq!(config.processing.chunk_size * 4, 1500);
        assert_eq!(config.processing.chunk_overlap, 0);
        assert!((config.chat.temperature - 0.4).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_string_matches_defaults() {
        let parsed: Config = toml::from_str(&Config::default_config_string()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.ollama.model, defaults.ollama.model);
        assert_eq!(parsed.processing.chunk_size, defaults.processing.chunk_size);
        assert_eq!(parsed.links.strip_elements, defaults.links.strip_elements);
        assert_eq!(parsed.chat.history_turns, defaults.chat.history_turns);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [ollama]
            model = "mistral"

            [general]
            default_owner = "alice"
            "#
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();

        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.general.default_owner, "alice");
        // Untouched sections keep their defaults
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.chat.max_context_chunks, 4);
    }

    #[test]
    fn test_load_rejects_bad_chunking() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [processing]
            chunk_size = 100
            chunk_overlap = 100
            "#
        )
        .unwrap();

        assert!(matches!(
            Config::load_from(temp_file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_set_values() {
        let mut config = Config::default();
        config.set("ollama.model", "qwen2").unwrap();
        config.set("chat.temperature", "0.1").unwrap();
        config.set("ui.color", "false").unwrap();

        assert_eq!(config.ollama.model, "qwen2");
        assert!((config.chat.temperature - 0.1).abs() < f32::EPSILON);
        assert!(!config.ui.color);

        assert!(config.set("chat.temperature", "warm").is_err());
        assert!(config.set("nope.key", "1").is_err());
        assert!(config.set("general.default_owner", "  ").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.chat.history_turns = 2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.chat.history_turns, 2);
    }
}
