use crate::sandbox::DEFAULT_STAGING_DIR;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required config field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    hostname: Option<String>,
    filesystem: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
}

/// Session settings, loaded once before the sandbox is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Shown in the prompt
    pub hostname: String,
    /// ZIP archive holding the initial tree
    pub filesystem: PathBuf,
    /// Where the archive is expanded
    pub staging_dir: PathBuf,
}

impl Config {
    /// Load a JSON config file.
    ///
    /// A relative `filesystem` path is taken relative to the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&contents, base_dir)
    }

    pub fn from_json(json: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let hostname = raw
            .hostname
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::MissingField("hostname"))?;

        let filesystem = raw
            .filesystem
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingField("filesystem"))?;

        let filesystem = if filesystem.is_relative() {
            base_dir.join(filesystem)
        } else {
            filesystem
        };

        Ok(Self {
            hostname,
            filesystem,
            staging_dir: raw
                .staging_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_DIR)),
        })
    }
}
