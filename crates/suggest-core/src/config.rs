//! Configuration types.
//!
//! A widget is configured from code or from `~/.config/suggest/config.toml`.
//! Every field is optional; missing fields take the defaults below.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default number of suggestions requested from the service.
pub const DEFAULT_COUNT: usize = 10;

/// Default lifetime of a cached response (10 minutes).
pub const DEFAULT_CACHE_TTL_MS: u64 = 600_000;

/// Runtime configuration of a suggestion widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Suppress fetching while the query is shorter than this many characters.
    /// Negative values in a config file clamp to zero.
    #[serde(deserialize_with = "deserialize_min_chars")]
    pub min_chars: usize,

    /// Debounce window in milliseconds. Zero dispatches immediately.
    pub delay_ms: u64,

    /// Requested result cap, forwarded to payload shaping.
    pub count: usize,

    /// Commit a suggestion when the input loses focus with the list open.
    pub select_on_blur: bool,

    /// Cache responses in memory.
    pub http_cache: bool,

    /// Lifetime of a cache entry in milliseconds.
    /// Also applies to entries written to a custom cache.
    pub http_cache_ttl_ms: u64,

    /// Fetch the initial text on mount when it is non-empty.
    pub autoload: bool,

    /// Initial input text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_query: Option<String>,

    /// Endpoint override. Defaults to the suggestion kind's endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// API token, sent as `Authorization: Token <token>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            min_chars: 0,
            delay_ms: 0,
            count: DEFAULT_COUNT,
            select_on_blur: false,
            http_cache: false,
            http_cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            autoload: false,
            default_query: None,
            url: None,
            token: None,
        }
    }
}

impl WidgetConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load `config.toml` from the config directory, falling back to defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Debounce window.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.http_cache_ttl_ms)
    }

    /// Requested result cap. Zero means "unset".
    pub fn effective_count(&self) -> usize {
        if self.count == 0 {
            DEFAULT_COUNT
        } else {
            self.count
        }
    }
}

fn deserialize_min_chars<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw).unwrap_or(0))
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("suggest"))
}

/// Get the path to config.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}
