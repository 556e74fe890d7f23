use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::provider::{NewsProviderId, PriceProviderId};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PRICE_PROVIDER: &str = "coingecko";
pub const DEFAULT_NEWS_PROVIDER: &str = "cryptocompare";
pub const DEFAULT_CURRENCY: &str = "USD";

pub const NEWS_TTL_SECS: u64 = 2 * 60;
pub const IMAGES_TTL_SECS: u64 = 5 * 60;
pub const TOKENS_TTL_SECS: u64 = 60 * 60;

const APP_DIR: &str = "terminal-proxy";
const CONFIG_FILE: &str = "config.toml";

/// Startup configuration, merged from defaults, an optional TOML file and the
/// environment. The runtime `ConfigStore` is seeded from it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub price: PriceConfig,
    pub news: NewsConfig,
    pub cache: CacheConfig,
    pub upstreams: UpstreamConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub provider: PriceProviderId,
    pub api_key: Option<String>,
    pub cmc_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub provider: NewsProviderId,
    pub api_key: Option<String>,
    pub custom_url: Option<String>,
    /// Terms removed from the general ("all") news wire.
    pub excluded_from_all: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            provider: NewsProviderId::default(),
            api_key: None,
            custom_url: None,
            excluded_from_all: vec!["solana".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub news_ttl_secs: u64,
    pub images_ttl_secs: u64,
    pub tokens_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            news_ttl_secs: NEWS_TTL_SECS,
            images_ttl_secs: IMAGES_TTL_SECS,
            tokens_ttl_secs: TOKENS_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn news_ttl(&self) -> Duration {
        Duration::from_secs(self.news_ttl_secs)
    }

    pub fn images_ttl(&self) -> Duration {
        Duration::from_secs(self.images_ttl_secs)
    }

    pub fn tokens_ttl(&self) -> Duration {
        Duration::from_secs(self.tokens_ttl_secs)
    }
}

/// Base URLs of every upstream. Tests point these at a mock server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub coingecko: String,
    pub coinmarketcap: String,
    pub cryptocompare: String,
    pub newsapi: String,
    pub jupiter: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            coingecko: crate::provider::coingecko::BASE_URL.to_string(),
            coinmarketcap: crate::provider::coinmarketcap::BASE_URL.to_string(),
            cryptocompare: crate::provider::cryptocompare::BASE_URL.to_string(),
            newsapi: crate::provider::newsapi::BASE_URL.to_string(),
            jupiter: crate::provider::jupiter::BASE_URL.to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Route every upstream to one base URL, each under its own path prefix.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            coingecko: format!("{}/coingecko/api/v3", base),
            coinmarketcap: format!("{}/cmc/v1", base),
            cryptocompare: format!("{}/cryptocompare", base),
            newsapi: format!("{}/newsapi/v2", base),
            jupiter: format!("{}/jupiter", base),
        }
    }
}

/// Per-call upstream timeouts, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub coingecko: u64,
    pub coinmarketcap: u64,
    pub cryptocompare: u64,
    pub newsapi: u64,
    pub custom: u64,
    pub jupiter: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            coingecko: 10,
            coinmarketcap: 10,
            cryptocompare: 10,
            newsapi: 10,
            custom: 8,
            jupiter: 15,
        }
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/terminal-proxy/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Load configuration from the default location, falling back to built-in
/// defaults when no file exists there.
pub fn load() -> Result<AppConfig> {
    match default_path() {
        Some(path) if path.exists() => load_from_path(&path),
        _ => {
            debug!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load configuration from an explicit path. A missing file is an error.
pub fn load_from_path(path: &Path) -> Result<AppConfig> {
    debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse(&contents).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse configuration from TOML text.
pub fn parse(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
}

/// Treat blank strings from env or forms as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
