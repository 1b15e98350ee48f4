//! Reads `~/.config/hacg-reader/config.toml`.
//!
//! The file is optional. Any subset of keys may be given; the rest take
//! their defaults. Unknown keys are accepted but logged.
use crate::feed::DEFAULT_PUBLISHER_URL;
use crate::http::{ClientSettings, DEFAULT_USER_AGENT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

const KNOWN_KEYS: [&str; 5] = [
    "domain",
    "publisher_url",
    "user_agent",
    "use_proxy",
    "request_timeout_secs",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed site host. When unset the domain is looked up on the publisher page.
    pub domain: Option<String>,

    /// Page scraped for the current domain.
    pub publisher_url: String,

    pub user_agent: String,

    /// Honour the system proxy settings.
    pub use_proxy: bool,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: None,
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            use_proxy: true,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// `$XDG_CONFIG_HOME/hacg-reader/config.toml`, falling back to `~/.config`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("hacg-reader").join("config.toml"))
    }

    /// Missing or blank file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }

        let mut config: Config = toml::from_str(content)?;
        config.domain = config
            .domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        tracing::info!(
            domain = config.domain.as_deref().unwrap_or("<auto>"),
            use_proxy = config.use_proxy,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            user_agent: self.user_agent.clone(),
            use_proxy: self.use_proxy,
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}
