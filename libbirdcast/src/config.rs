//! Configuration management for Birdcast
//!
//! Configuration is read from a TOML file (see [`resolve_config_path`]). A
//! missing file is not an error: every section has defaults, and the Twitter
//! credentials usually come from the environment instead (see
//! [`crate::credentials`]).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub twitter: TwitterConfig,
    pub media: MediaConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
}

/// Twitter API settings
///
/// Credential fields are optional here; environment variables take
/// precedence over them.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub access_token_secret: Option<String>,
    /// Base URL for the v1.1/v2 REST API
    pub api_base: String,
    /// Base URL for media uploads
    pub upload_base: String,
    /// Timeout applied to each API request
    pub request_timeout_secs: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            access_token: None,
            access_token_secret: None,
            api_base: "https://api.twitter.com".to_string(),
            upload_base: "https://upload.twitter.com".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "[REDACTED]"
            } else {
                "None"
            }
        }

        f.debug_struct("TwitterConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("access_token", &redact(&self.access_token))
            .field("access_token_secret", &redact(&self.access_token_secret))
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl TwitterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Timeout for fetching remote media
    pub download_timeout_secs: u64,
    /// Maximum post length in characters
    pub max_text_length: usize,
    /// Directory for downloaded media; system temp dir when unset
    pub temp_dir: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 60,
            max_text_length: 280,
            temp_dir: None,
        }
    }
}

impl MediaConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn expand_temp_dir(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2.0,
            max_delay_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    pub bind: String,
    /// Where uploaded files are stored; `<tmp>/birdcast_uploads` when unset
    pub upload_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            upload_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn resolve_upload_dir(&self) -> PathBuf {
        match &self.upload_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).to_string()),
            None => std::env::temp_dir().join("birdcast_uploads"),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// Falls back to defaults when no configuration file exists.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// Values that parse as TOML but cannot be used (such as a retry delay
    /// of `inf`) are rejected with [`ConfigError::InvalidValue`].
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde accepts but the publisher cannot use
    pub fn validate(&self) -> Result<()> {
        RetryPolicy::try_from(&self.retry)?;
        Ok(())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("BIRDCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("birdcast").join("config.toml"))
}
