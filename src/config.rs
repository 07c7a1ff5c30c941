//! Store configuration, optionally loaded from a YAML file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings for opening a `SqliteStore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. Falls back to `default_db_path()` when unset.
    pub db_path: Option<PathBuf>,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Write-ahead logging, so readers are not blocked by a writer
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: 5000,
            wal: true,
        }
    }
}

impl StoreConfig {
    /// Load a config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Database path: an explicit override wins, then the configured path,
    /// then the platform default.
    pub fn resolve_db_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| self.db_path.clone())
            .unwrap_or_else(default_db_path)
    }
}

/// Default database path (~/.local/share/provstore/provstore.db on Linux)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("provstore").join("provstore.db")
}
