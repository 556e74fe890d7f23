use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::http::{self, Upstream};
use super::{ListingsQuery, PriceProviderId, PriceSource};
use crate::error::{Error, PRICE_KEY_HINT, Result};
use crate::model::Listing;
use crate::normalize::listings::{self as normalize, CoinGeckoMarket};

pub const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Rows per page for bulk market fetches (CoinGecko's maximum).
pub const MAX_PER_PAGE: u32 = 250;

const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";

/// CoinGecko provider -- free public API, an optional demo key is sent when configured.
pub struct CoinGecko {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
    symbol: String,
}

impl CoinGecko {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn upstream(&self) -> Upstream {
        Upstream {
            provider: PriceProviderId::CoinGecko.name(),
            hint: PRICE_KEY_HINT,
            timeout: self.timeout,
            user_supplied_url: false,
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)], credential: Option<&str>) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, params = ?params, "fetching from CoinGecko");

        let mut request = self.client.get(&url).query(params);
        if let Some(key) = credential {
            request = request.header(DEMO_KEY_HEADER, key);
        }
        http::send(request, &self.upstream()).await
    }

    /// `/coins/markets` with the currency-rejection case split out.
    async fn markets(
        &self,
        currency: &str,
        extra: &[(&str, String)],
        credential: Option<&str>,
    ) -> Result<Vec<CoinGeckoMarket>> {
        let mut params = vec![
            ("vs_currency", currency.to_lowercase()),
            ("order", "market_cap_desc".to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "24h,7d".to_string()),
        ];
        params.extend(extra.iter().cloned());

        let up = self.upstream();
        let (status, body) = self.get("/coins/markets", &params, credential).await?;

        if status == StatusCode::BAD_REQUEST && body.contains("vs_currency") {
            return Err(Error::UnsupportedCurrency {
                provider: up.provider,
                currency: currency.to_uppercase(),
            });
        }
        http::check_status(status, &body, &up)?;

        normalize::parse_coingecko_markets(&body)
    }

    /// One page of the full market table, used to build the image index.
    pub async fn market_page(&self, page: u32) -> Result<Vec<CoinGeckoMarket>> {
        self.markets(
            "usd",
            &[("per_page", MAX_PER_PAGE.to_string()), ("page", page.to_string())],
            None,
        )
        .await
    }

    /// Resolve a ticker symbol to a CoinGecko coin id via `/search` (exact symbol match).
    pub async fn search_coin_id(&self, symbol: &str) -> Result<Option<String>> {
        let up = self.upstream();
        let (status, body) = self
            .get("/search", &[("query", symbol.to_lowercase())], None)
            .await?;
        http::check_status(status, &body, &up)?;

        let data: SearchResponse =
            serde_json::from_str(&body).map_err(|e| http::parse_error(&up, e))?;
        Ok(data
            .coins
            .into_iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
            .map(|c| c.id))
    }

    /// Coin detail in CoinGecko's native shape.
    pub async fn coin_detail(&self, id: &str) -> Result<serde_json::Value> {
        let up = self.upstream();
        let params = [
            ("localization", "false".to_string()),
            ("tickers", "false".to_string()),
            ("market_data", "false".to_string()),
            ("community_data", "true".to_string()),
            ("developer_data", "false".to_string()),
            ("sparkline", "false".to_string()),
        ];
        let (status, body) = self.get(&format!("/coins/{}", id), &params, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::BadRequest(format!("CoinGecko has no coin with id '{}'", id)));
        }
        http::check_status(status, &body, &up)?;
        serde_json::from_str(&body).map_err(|e| http::parse_error(&up, e))
    }

    /// Market row for a single coin in CoinGecko's native shape.
    pub async fn coin_market(&self, id: &str, currency: &str) -> Result<serde_json::Value> {
        let up = self.upstream();
        let params = [
            ("vs_currency", currency.to_lowercase()),
            ("ids", id.to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "1h,24h,7d,30d".to_string()),
        ];
        let (status, body) = self.get("/coins/markets", &params, None).await?;
        http::check_status(status, &body, &up)?;

        let rows: Vec<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| http::parse_error(&up, e))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::BadRequest(format!("CoinGecko has no market data for '{}'", id)))
    }
}

#[async_trait]
impl PriceSource for CoinGecko {
    fn id(&self) -> PriceProviderId {
        PriceProviderId::CoinGecko
    }

    async fn listings(&self, query: &ListingsQuery, credential: Option<&str>) -> Result<Vec<Listing>> {
        // CoinGecko paginates by page, so the offset inside the page is dropped.
        let markets = self
            .markets(
                &query.currency,
                &[
                    ("per_page", query.limit.to_string()),
                    ("page", query.page().to_string()),
                ],
                credential,
            )
            .await?;

        let offset = (query.page() - 1) * query.limit;
        Ok(normalize::from_coingecko(markets, &query.currency, offset))
    }

    async fn quotes(
        &self,
        symbols: &[String],
        currency: &str,
        credential: Option<&str>,
    ) -> Result<Vec<Listing>> {
        let joined = symbols
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");

        let markets = self
            .markets(
                currency,
                &[("symbols", joined), ("per_page", MAX_PER_PAGE.to_string())],
                credential,
            )
            .await?;

        let listings = normalize::coingecko_quotes(markets, symbols, currency);
        if listings.is_empty() {
            return Err(Error::Provider {
                provider: self.name(),
                message: format!("CoinGecko has no market data for {}", symbols.join(",")),
            });
        }
        Ok(listings)
    }
}
