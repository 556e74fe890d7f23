use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical price entity, serialized in the CoinMarketCap-compatible layout
/// the terminal frontend reads. Fields a provider does not supply stay `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    #[serde(rename = "cmc_rank")]
    pub rank: Option<u32>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub last_updated: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Keyed by upper-case currency code.
    pub quote: BTreeMap<String, Quote>,
}

/// Market data for one listing in one currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub market_cap: Option<f64>,
    pub fully_diluted_market_cap: Option<f64>,
    pub last_updated: Option<String>,
}

/// Canonical news article, serialized in the CryptoCompare-compatible layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub published_on: i64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub source_info: SourceInfo,
    pub categories: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageurl: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
}

impl Article {
    /// Case-insensitive substring match across title, body and categories.
    pub fn mentions(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.body.to_lowercase().contains(&term)
            || self.categories.to_lowercase().contains(&term)
    }
}

/// Token metadata from the Solana token list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: Option<u8>,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `status` block of listing and quote responses.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseStatus {
    pub timestamp: String,
    pub error_code: u32,
    pub error_message: Option<String>,
    pub elapsed: u64,
    pub credit_count: u32,
    pub notice: String,
}

impl ResponseStatus {
    pub fn ok(notice: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            error_code: 0,
            error_message: None,
            elapsed: elapsed_ms,
            credit_count: 0,
            notice: notice.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingsResponse {
    pub status: ResponseStatus,
    pub data: Vec<Listing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotesResponse {
    pub status: ResponseStatus,
    pub data: BTreeMap<String, Listing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    #[serde(rename = "Data")]
    pub data: Vec<Article>,
}

/// Verified token list keyed by mint address.
#[derive(Debug, Clone, Serialize)]
pub struct TokensResponse {
    pub tokens: BTreeMap<String, TokenInfo>,
    pub count: usize,
}

impl TokensResponse {
    pub fn from_tokens(tokens: &[TokenInfo]) -> Self {
        let tokens: BTreeMap<String, TokenInfo> = tokens
            .iter()
            .map(|t| (t.address.clone(), t.clone()))
            .collect();
        Self {
            count: tokens.len(),
            tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub api: String,
    pub version: &'static str,
}
