//! Configuration file parser for ~/.config/firehose/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which has an empty feed roster. Unknown keys are accepted but logged,
//! since they are usually typos.
use crate::feed::{FetchOptions, RetryConfig};
use crate::store::FeedSource;
use crate::util::validate_fetch_url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// CNCF landscape document used to enrich feeds with project metadata.
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/cncf/landscape/master/landscape.yml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidFeedUrl { url: String, reason: String },

    #[error("failure_threshold must be between 0 and 1, got {0}")]
    InvalidThreshold(f64),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level pipeline configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed roster, one `[[feeds]]` table per feed.
    pub feeds: Vec<FeedSource>,

    /// Where the project catalog is downloaded from.
    pub catalog_url: String,

    /// Local catalog file; takes precedence over `catalog_url`.
    pub catalog_path: Option<PathBuf>,

    /// Timeout for a single fetch attempt, in seconds.
    pub fetch_timeout_secs: u64,

    /// Share of failed feeds above which the run is aborted.
    pub failure_threshold: f64,

    /// Optional cap on concurrent fetches.
    pub max_concurrency: Option<usize>,

    pub user_agent: String,

    pub retry: RetryConfig,

    /// JSON output destination. Stdout when unset.
    pub output_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_path: None,
            fetch_timeout_secs: 10,
            failure_threshold: 0.5,
            max_concurrency: None,
            user_agent: concat!("firehose/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryConfig::default(),
            output_path: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "feeds",
        "catalog_url",
        "catalog_path",
        "fetch_timeout_secs",
        "failure_threshold",
        "max_concurrency",
        "user_agent",
        "retry",
        "output_path",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Malformed feed URL → `Err(ConfigError::InvalidFeedUrl)`
    /// - Unknown keys → accepted, logged as warning
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

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(ConfigError::InvalidThreshold(self.failure_threshold));
        }
        for feed in &self.feeds {
            validate_fetch_url(&feed.url).map_err(|e| ConfigError::InvalidFeedUrl {
                url: feed.url.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn to_fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.fetch_timeout(),
            retry: self.retry.clone(),
            max_concurrency: self.max_concurrency,
            failure_threshold: self.failure_threshold,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
