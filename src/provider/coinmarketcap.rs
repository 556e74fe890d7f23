use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::http::{self, Upstream};
use super::{ListingsQuery, PriceProviderId, PriceSource};
use crate::error::{Error, PRICE_KEY_HINT, Result};
use crate::model::Listing;
use crate::normalize::listings as normalize;

pub const BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";

const KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// CoinMarketCap provider -- requires an API key.
pub struct CoinMarketCap {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CoinMarketCap {
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
            provider: PriceProviderId::CoinMarketCap.name(),
            hint: PRICE_KEY_HINT,
            timeout: self.timeout,
            user_supplied_url: false,
        }
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        credential: Option<&str>,
    ) -> Result<String> {
        let up = self.upstream();
        let key = credential.ok_or(Error::MissingCredential {
            provider: up.provider,
            hint: up.hint,
        })?;
        let currency = params
            .iter()
            .find(|(k, _)| *k == "convert")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, params = ?params, "fetching from CoinMarketCap");

        let request = self
            .client
            .get(&url)
            .query(params)
            .header(KEY_HEADER, key)
            .header(reqwest::header::ACCEPT, "application/json");
        let (status, body) = http::send(request, &up).await?;

        if status == StatusCode::BAD_REQUEST && body.contains("convert") {
            return Err(Error::UnsupportedCurrency {
                provider: up.provider,
                currency,
            });
        }
        http::check_status(status, &body, &up)?;
        Ok(body)
    }

    fn body_error(&self, message: String) -> Error {
        Error::Provider {
            provider: self.name(),
            message: format!("CoinMarketCap: {}", message),
        }
    }
}

#[async_trait]
impl PriceSource for CoinMarketCap {
    fn id(&self) -> PriceProviderId {
        PriceProviderId::CoinMarketCap
    }

    async fn listings(&self, query: &ListingsQuery, credential: Option<&str>) -> Result<Vec<Listing>> {
        let params = [
            ("start", query.start.to_string()),
            ("limit", query.limit.to_string()),
            ("convert", query.currency.clone()),
        ];
        let body = self
            .get("/cryptocurrency/listings/latest", &params, credential)
            .await?;

        normalize::from_cmc_listings(&body)?.map_err(|msg| self.body_error(msg))
    }

    async fn quotes(
        &self,
        symbols: &[String],
        currency: &str,
        credential: Option<&str>,
    ) -> Result<Vec<Listing>> {
        let symbols_upper: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        let params = [
            ("symbol", symbols_upper.join(",")),
            ("convert", currency.to_uppercase()),
        ];
        let body = self
            .get("/cryptocurrency/quotes/latest", &params, credential)
            .await?;

        let listings = normalize::from_cmc_quotes(&body, &symbols_upper)?
            .map_err(|msg| self.body_error(msg))?;
        if listings.is_empty() {
            return Err(self.body_error(format!("no quotes for {}", symbols_upper.join(","))));
        }
        Ok(listings)
    }
}
