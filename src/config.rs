//! Server configuration.
//!
//! Loaded from `~/.config/anki-mcp/config.toml`. A missing file means
//! defaults; `ANKICONNECT_URL` overrides the endpoint either way.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default AnkiConnect endpoint.
const DEFAULT_ANKICONNECT_URL: &str = "http://127.0.0.1:8765";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AnkiConnect endpoint settings.
    #[serde(default)]
    pub ankiconnect: AnkiConnectConfig,

    /// Streaming HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Card listing settings.
    #[serde(default)]
    pub cards: CardsConfig,
}

/// AnkiConnect endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnkiConnectConfig {
    /// Endpoint URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Streaming HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address for `serve` mode.
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// Card listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardsConfig {
    /// Maximum cards fetched per due/new listing.
    #[serde(default = "default_card_limit")]
    pub limit: usize,

    /// Character budget for question/answer previews.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_url() -> String {
    DEFAULT_ANKICONNECT_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_bind() -> String {
    "127.0.0.1:3030".to_string()
}

fn default_card_limit() -> usize {
    5
}

fn default_preview_chars() -> usize {
    120
}

impl Default for AnkiConnectConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for CardsConfig {
    fn default() -> Self {
        Self {
            limit: default_card_limit(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ankiconnect: AnkiConnectConfig::default(),
            http: HttpConfig::default(),
            cards: CardsConfig::default(),
        }
    }
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or(Error::ConfigDirNotFound)?;
        Ok(config_dir.join("anki-mcp").join("config.toml"))
    }

    /// Load the config, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self, Error> {
        let path = Self::path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        if let Ok(url) = std::env::var("ANKICONNECT_URL") {
            if !url.is_empty() {
                config.ankiconnect.url = url;
            }
        }
        Ok(config)
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::ConfigParse(e.to_string()))?;
        let with_header = format!("# anki-mcp configuration\n\n{}", content);
        fs::write(path, with_header)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ankiconnect.url, "http://127.0.0.1:8765");
        assert_eq!(config.ankiconnect.timeout_secs, 10);
        assert_eq!(config.cards.limit, 5);
        assert_eq!(config.cards.preview_chars, 120);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.ankiconnect.url = "http://localhost:9999".to_string();
        config.cards.limit = 20;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ankiconnect.url, "http://localhost:9999");
        assert_eq!(loaded.cards.limit, 20);
        assert_eq!(loaded.http.bind, "127.0.0.1:3030");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cards]\nlimit = 3\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cards.limit, 3);
        assert_eq!(loaded.ankiconnect.url, "http://127.0.0.1:8765");
    }
}
