//! Configuration for the search pipeline and symbol provider
//!
//! Loaded from a TOML file with two optional sections:
//!
//! ```toml
//! [search]
//! debounce_ms = 300
//! min_query_len = 2
//! threshold = 0.3
//! result_limit = 50
//!
//! [provider]
//! exchange = "US"
//! token = "..."
//! ```
//!
//! Missing sections and keys fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debounce::DEFAULT_DEBOUNCE_MS;
use crate::index::DEFAULT_THRESHOLD;

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV_VAR: &str = "FINNHUB_TOKEN";

/// Default symbol directory endpoint
pub const DEFAULT_ENDPOINT: &str = "https://finnhub.io/api/v1/stock/symbol";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Query pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Quiet period before a query is searched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Trimmed queries shorter than this produce no results
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Fuzzy match threshold (0 = exact, 1 = anything)
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Maximum number of results per query
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Start a directory retrieval as soon as the pipeline starts
    #[serde(default = "default_true")]
    pub auto_fetch: bool,

    /// Re-run the last query when a refreshed directory arrives
    #[serde(default)]
    pub rerun_on_refresh: bool,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_min_query_len() -> usize {
    2
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_result_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            threshold: default_threshold(),
            result_limit: default_result_limit(),
            auto_fetch: true,
            rerun_on_refresh: false,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Remote symbol provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Exchange code passed to the provider (e.g. "US")
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Access token; falls back to the FINNHUB_TOKEN environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_exchange() -> String {
    "US".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            exchange: default_exchange(),
            token: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Resolve the access token
    ///
    /// Checks in priority order:
    /// 1. `token` from the config file
    /// 2. FINNHUB_TOKEN environment variable
    /// 3. Error if not found
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.token.as_deref().filter(|t| !t.trim().is_empty()) {
            log::debug!("Using provider token from config file");
            return Ok(token.to_string());
        }

        env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| {
                format!(
                    "Provider token not found.\n\
                     \n\
                     Either:\n\
                     1. Set `token` under [provider] in {}\n\
                     2. Set the {} environment variable\n\
                     \n\
                     Example: export {}=your-token",
                    default_config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "~/.stockfind/config.toml".to_string()),
                    TOKEN_ENV_VAR,
                    TOKEN_ENV_VAR
                )
            })
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        let search = &self.search;

        if !(0.0..=1.0).contains(&search.threshold) {
            anyhow::bail!("threshold must be between 0.0 and 1.0. Got: {}", search.threshold);
        }
        if search.result_limit == 0 {
            anyhow::bail!("result_limit must be greater than 0");
        }
        if search.debounce_ms > 10_000 {
            anyhow::bail!(
                "debounce_ms must be at most 10000ms (10s). Got: {}ms",
                search.debounce_ms
            );
        }
        if self.provider.exchange.trim().is_empty() {
            anyhow::bail!("exchange must not be empty");
        }

        Ok(())
    }

    /// Render as TOML with the token redacted
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.provider.token.is_some() {
            redacted.provider.token = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&redacted).context("Failed to serialize config")
    }
}

/// Location of the per-user config file (~/.stockfind/config.toml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".stockfind").join("config.toml"))
}

/// Load configuration
///
/// An explicit path must exist. Without one, ~/.stockfind/config.toml is used
/// if present, otherwise defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                log::debug!("No config.toml found, using default config");
                return Ok(Config::default());
            }
        },
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    log::debug!("Loaded config from {}", path.display());
    Config::from_toml_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}
