pub mod coingecko;
pub mod coinmarketcap;
pub mod cryptocompare;
pub mod custom;
mod http;
pub mod jupiter;
pub mod newsapi;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{DATA_SETTINGS_HINT, Error, NEWS_KEY_HINT, NEWS_URL_HINT, PRICE_KEY_HINT, Result};
use crate::model::Listing;

const USER_AGENT: &str = concat!("terminal-proxy/", env!("CARGO_PKG_VERSION"));

/// Upstream supplying listings and quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceProviderId {
    #[default]
    #[serde(rename = "coingecko")]
    CoinGecko,
    #[serde(rename = "cryptocompare")]
    CryptoCompare,
    #[serde(rename = "cmc", alias = "coinmarketcap")]
    CoinMarketCap,
}

impl PriceProviderId {
    pub const ALL: [PriceProviderId; 3] = [Self::CoinGecko, Self::CryptoCompare, Self::CoinMarketCap];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoinGecko => "coingecko",
            Self::CryptoCompare => "cryptocompare",
            Self::CoinMarketCap => "cmc",
        }
    }

    pub fn info(self) -> &'static ProviderInfo {
        match self {
            Self::CoinGecko => &REGISTRY[0],
            Self::CryptoCompare => &REGISTRY[1],
            Self::CoinMarketCap => &REGISTRY[2],
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl FromStr for PriceProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coingecko" => Ok(Self::CoinGecko),
            "cryptocompare" => Ok(Self::CryptoCompare),
            "cmc" | "coinmarketcap" => Ok(Self::CoinMarketCap),
            other => Err(Error::BadRequest(format!(
                "unknown price provider '{}' -- expected coingecko, cryptocompare or cmc",
                other
            ))),
        }
    }
}

impl fmt::Display for PriceProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream supplying news articles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NewsProviderId {
    #[default]
    #[serde(rename = "cryptocompare")]
    CryptoCompare,
    #[serde(rename = "newsapi")]
    NewsApi,
    #[serde(rename = "custom")]
    Custom,
}

impl NewsProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CryptoCompare => "cryptocompare",
            Self::NewsApi => "newsapi",
            Self::Custom => "custom",
        }
    }

    pub fn info(self) -> &'static ProviderInfo {
        match self {
            Self::CryptoCompare => &REGISTRY[3],
            Self::NewsApi => &REGISTRY[4],
            Self::Custom => &REGISTRY[5],
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl FromStr for NewsProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cryptocompare" => Ok(Self::CryptoCompare),
            "newsapi" => Ok(Self::NewsApi),
            "custom" => Ok(Self::Custom),
            other => Err(Error::BadRequest(format!(
                "unknown news provider '{}' -- expected cryptocompare, newsapi or custom",
                other
            ))),
        }
    }
}

impl fmt::Display for NewsProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Price,
    News,
    Auxiliary,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::News => "news",
            Self::Auxiliary => "auxiliary",
        }
    }
}

/// Static description of one upstream.
#[derive(Debug)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ProviderKind,
    pub base_url: &'static str,
    /// Whether the provider refuses to serve as a primary source without a key.
    pub requires_credential: bool,
    /// Settings location shown in error messages.
    pub hint: &'static str,
}

pub static REGISTRY: [ProviderInfo; 7] = [
    ProviderInfo {
        id: "coingecko",
        name: "CoinGecko",
        kind: ProviderKind::Price,
        base_url: coingecko::BASE_URL,
        requires_credential: false,
        hint: PRICE_KEY_HINT,
    },
    ProviderInfo {
        id: "cryptocompare",
        name: "CryptoCompare",
        kind: ProviderKind::Price,
        base_url: cryptocompare::BASE_URL,
        requires_credential: true,
        hint: PRICE_KEY_HINT,
    },
    ProviderInfo {
        id: "cmc",
        name: "CoinMarketCap",
        kind: ProviderKind::Price,
        base_url: coinmarketcap::BASE_URL,
        requires_credential: true,
        hint: PRICE_KEY_HINT,
    },
    ProviderInfo {
        id: "cryptocompare",
        name: "CryptoCompare",
        kind: ProviderKind::News,
        base_url: cryptocompare::BASE_URL,
        requires_credential: false,
        hint: NEWS_KEY_HINT,
    },
    ProviderInfo {
        id: "newsapi",
        name: "NewsAPI",
        kind: ProviderKind::News,
        base_url: newsapi::BASE_URL,
        requires_credential: true,
        hint: NEWS_KEY_HINT,
    },
    ProviderInfo {
        id: "custom",
        name: "custom news",
        kind: ProviderKind::News,
        base_url: "(user supplied)",
        requires_credential: false,
        hint: NEWS_URL_HINT,
    },
    ProviderInfo {
        id: "jupiter",
        name: "Jupiter",
        kind: ProviderKind::Auxiliary,
        base_url: jupiter::BASE_URL,
        requires_credential: false,
        hint: DATA_SETTINGS_HINT,
    },
];

/// Page of listings to fetch. `start` is the 1-based rank of the first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingsQuery {
    pub start: u32,
    pub limit: u32,
    /// Upper-case currency code.
    pub currency: String,
}

impl ListingsQuery {
    pub fn new(start: u32, limit: u32, currency: &str) -> Self {
        Self {
            start: start.max(1),
            limit: limit.clamp(1, 250),
            currency: currency.trim().to_uppercase(),
        }
    }

    /// 1-based page number for providers that paginate by page.
    pub fn page(&self) -> u32 {
        (self.start - 1) / self.limit + 1
    }

    /// Zero-based rank offset of the first entry.
    pub fn offset(&self) -> u32 {
        self.start - 1
    }

    pub fn in_currency(&self, currency: &str) -> Self {
        Self {
            currency: currency.to_uppercase(),
            ..self.clone()
        }
    }
}

/// Adapter implemented by every price upstream.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn id(&self) -> PriceProviderId;

    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Ranked listings in the requested currency.
    ///
    /// Returns `Error::UnsupportedCurrency` when the upstream rejects the currency.
    async fn listings(&self, query: &ListingsQuery, credential: Option<&str>) -> Result<Vec<Listing>>;

    /// Listings for specific symbols.
    async fn quotes(
        &self,
        symbols: &[String],
        currency: &str,
        credential: Option<&str>,
    ) -> Result<Vec<Listing>>;
}

/// Every upstream adapter, built once and shared by all requests.
pub struct Providers {
    pub coingecko: coingecko::CoinGecko,
    pub cryptocompare: cryptocompare::CryptoCompare,
    pub coinmarketcap: coinmarketcap::CoinMarketCap,
    pub newsapi: newsapi::NewsApi,
    pub custom: custom::CustomFeed,
    pub jupiter: jupiter::Jupiter,
}

impl Providers {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let up = &config.upstreams;
        let t = &config.timeouts;

        Ok(Self {
            coingecko: coingecko::CoinGecko::new(client.clone(), &up.coingecko)
                .with_timeout(Duration::from_secs(t.coingecko)),
            cryptocompare: cryptocompare::CryptoCompare::new(client.clone(), &up.cryptocompare)
                .with_timeout(Duration::from_secs(t.cryptocompare)),
            coinmarketcap: coinmarketcap::CoinMarketCap::new(client.clone(), &up.coinmarketcap)
                .with_timeout(Duration::from_secs(t.coinmarketcap)),
            newsapi: newsapi::NewsApi::new(client.clone(), &up.newsapi)
                .with_timeout(Duration::from_secs(t.newsapi)),
            custom: custom::CustomFeed::new(client.clone())
                .with_timeout(Duration::from_secs(t.custom)),
            jupiter: jupiter::Jupiter::new(client, &up.jupiter)
                .with_timeout(Duration::from_secs(t.jupiter)),
        })
    }

    pub fn price_source(&self, id: PriceProviderId) -> &dyn PriceSource {
        match id {
            PriceProviderId::CoinGecko => &self.coingecko,
            PriceProviderId::CryptoCompare => &self.cryptocompare,
            PriceProviderId::CoinMarketCap => &self.coinmarketcap,
        }
    }
}
