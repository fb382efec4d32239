//! Configuration management for the GCDM client
//!
//! Handles loading, validating, and persisting the server address, timeouts
//! and chunk handling policy. Precedence, lowest first: built-in defaults,
//! config file, environment, command-line flags.

use crate::error::{GcdmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub mod defaults;

pub use defaults::*;

/// How a multi-chunk data stream is handed to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChunkPolicy {
    /// Keep only the first streamed chunk and discard the rest
    First,
    /// Keep every chunk in arrival order
    All,
}

impl fmt::Display for ChunkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for ChunkPolicy {
    type Err = GcdmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(GcdmError::InvalidConfig(format!(
                "unknown chunk policy '{other}' (expected 'first' or 'all')"
            ))),
        }
    }
}

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// GCDM server URL
    #[serde(default = "defaults::default_server_url")]
    pub server_url: String,

    /// Connection timeout in seconds
    #[serde(default = "defaults::default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-call timeout in seconds
    #[serde(default = "defaults::default_timeout")]
    pub timeout_secs: u64,

    /// Largest gRPC message accepted from the server
    #[serde(default = "defaults::default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Multi-chunk stream handling
    #[serde(default = "defaults::default_chunk_policy")]
    pub chunk_policy: ChunkPolicy,

    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Load configuration from `path` if it exists, else defaults, then
    /// apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read and `InvalidConfig` if
    /// it is not valid TOML for this schema.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| GcdmError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&contents).map_err(|e| GcdmError::InvalidConfig(e.to_string()))
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns `ConfigWrite` if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GcdmError::ConfigWrite {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| GcdmError::SerializationError(e.to_string()))?;

        fs::write(path, contents).map_err(|e| GcdmError::ConfigWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the path to the config file
    ///
    /// Tries in order:
    /// 1. `XDG_CONFIG_HOME/gcdm/config.toml`
    /// 2. `~/.config/gcdm/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if neither location can be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")));

        config_home
            .ok_or_else(|| {
                GcdmError::Internal(
                    "Could not determine config directory: XDG_CONFIG_HOME not set and no home directory found"
                        .to_string(),
                )
            })
            .map(|path| path.join("gcdm").join("config.toml"))
    }

    /// Apply `GCDM_SERVER_URL` and `GCDM_TIMEOUT_SECS` overrides
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `GCDM_TIMEOUT_SECS` is not an integer.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = std::env::var(ENV_SERVER_URL).ok().filter(|v| !v.is_empty()) {
            self.server_url = url;
        }
        if let Some(raw) = std::env::var(ENV_TIMEOUT_SECS).ok().filter(|v| !v.is_empty()) {
            self.timeout_secs = raw.parse().map_err(|_| {
                GcdmError::InvalidConfig(format!("{ENV_TIMEOUT_SECS} must be an integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a non-HTTP server URL or a zero limit.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(GcdmError::InvalidConfig(
                "server_url cannot be empty".to_string(),
            ));
        }

        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(GcdmError::InvalidConfig(format!(
                "server_url must start with http:// or https://, got '{}'",
                self.server_url
            )));
        }

        if self.connect_timeout_secs == 0 || self.timeout_secs == 0 {
            return Err(GcdmError::InvalidConfig(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.max_message_bytes == 0 {
            return Err(GcdmError::InvalidConfig(
                "max_message_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-call timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            max_message_bytes: default_max_message_bytes(),
            chunk_policy: default_chunk_policy(),
            verbose: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:1234");
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.chunk_policy, ChunkPolicy::All);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server_url = "localhost:1234".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcdm").join("config.toml");

        let mut config = Config::default();
        config.server_url = "http://data.example.org:9000".to_string();
        config.chunk_policy = ChunkPolicy::First;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout_secs = 42\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timeout_secs, 42);
        assert_eq!(loaded.server_url, default_server_url());
        assert_eq!(loaded.chunk_policy, ChunkPolicy::All);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "chunk_policy = \"sometimes\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(GcdmError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_chunk_policy_parse() {
        assert_eq!("FIRST".parse::<ChunkPolicy>().unwrap(), ChunkPolicy::First);
        assert_eq!("all".parse::<ChunkPolicy>().unwrap(), ChunkPolicy::All);
        assert!("some".parse::<ChunkPolicy>().is_err());
        assert_eq!(ChunkPolicy::First.to_string(), "first");
    }
}
