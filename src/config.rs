use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::file::{BUFFER_POOL_SIZE, PAGE_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine parameters. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Directory holding the backing files and the catalog snapshot
    pub db_path: PathBuf,
    /// Number of backing files
    pub file_count: usize,
    /// Maximum size of one backing file in bytes
    pub max_file_size: u64,
    /// Number of buffer pool frames
    pub frame_count: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("DB"),
            file_count: 4,
            max_file_size: 1024 * PAGE_SIZE as u64,
            frame_count: BUFFER_POOL_SIZE,
        }
    }
}

impl DbConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.file_count == 0 {
            return Err(ConfigError::Invalid("file_count must be at least 1".into()));
        }
        if self.frame_count == 0 {
            return Err(ConfigError::Invalid("frame_count must be at least 1".into()));
        }
        if self.max_file_size < PAGE_SIZE as u64 {
            return Err(ConfigError::Invalid(format!(
                "max_file_size must hold at least one page ({} bytes)",
                PAGE_SIZE
            )));
        }
        Ok(())
    }
}
