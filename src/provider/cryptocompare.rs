use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::http::{self, Upstream};
use super::{ListingsQuery, NewsProviderId, PriceProviderId, PriceSource};
use crate::error::{Error, NEWS_KEY_HINT, PRICE_KEY_HINT, Result};
use crate::model::{Article, Listing};
use crate::normalize::listings as normalize;
use crate::normalize::news::NewsPayload;

pub const BASE_URL: &str = "https://min-api.cryptocompare.com";

/// CryptoCompare -- serves both prices and the default news wire. Works keyless
/// on the free tier; a key is passed as `api_key` when configured.
pub struct CryptoCompare {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CryptoCompare {
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

    fn upstream(&self, hint: &'static str) -> Upstream {
        Upstream {
            provider: PriceProviderId::CryptoCompare.name(),
            hint,
            timeout: self.timeout,
            user_supplied_url: false,
        }
    }

    async fn get(
        &self,
        path: &str,
        mut params: Vec<(&str, String)>,
        credential: Option<&str>,
        up: &Upstream,
    ) -> Result<String> {
        if let Some(key) = credential {
            params.push(("api_key", key.to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "fetching from CryptoCompare");

        let (status, body) = http::send(self.client.get(&url).query(&params), up).await?;
        http::check_status(status, &body, up)?;
        Ok(body)
    }

    /// Map a `{"Response":"Error"}` message onto the error taxonomy.
    fn body_error(message: String, currency: Option<&str>, up: &Upstream) -> Error {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") {
            Error::RateLimited {
                provider: up.provider,
                hint: up.hint,
            }
        } else if lower.contains("api key") || lower.contains("api_key") || lower.contains("auth key") {
            Error::Auth {
                provider: up.provider,
                hint: up.hint,
            }
        } else if let Some(cur) = currency.filter(|_| lower.contains("tosymbol") || lower.contains("tsym")) {
            Error::UnsupportedCurrency {
                provider: up.provider,
                currency: cur.to_uppercase(),
            }
        } else {
            Error::Provider {
                provider: up.provider,
                message,
            }
        }
    }

    /// Latest articles from `/data/v2/news/`.
    pub async fn news(&self, credential: Option<&str>) -> Result<Vec<Article>> {
        let up = self.upstream(NEWS_KEY_HINT);
        let body = self
            .get("/data/v2/news/", vec![("lang", "EN".to_string())], credential, &up)
            .await?;

        NewsPayload::parse(&body)?.into_articles(NewsProviderId::CryptoCompare.name(), "cryptocompare")
    }
}

#[async_trait]
impl PriceSource for CryptoCompare {
    fn id(&self) -> PriceProviderId {
        PriceProviderId::CryptoCompare
    }

    async fn listings(&self, query: &ListingsQuery, credential: Option<&str>) -> Result<Vec<Listing>> {
        let up = self.upstream(PRICE_KEY_HINT);
        let params = vec![
            ("limit", query.limit.to_string()),
            // zero-based page index
            ("page", (query.page() - 1).to_string()),
            ("tsym", query.currency.clone()),
        ];
        let body = self.get("/data/top/mktcapfull", params, credential, &up).await?;

        if let Some(msg) = normalize::cryptocompare_error_message(&body) {
            return Err(Self::body_error(msg, Some(&query.currency), &up));
        }
        let offset = (query.page() - 1) * query.limit;
        normalize::from_cryptocompare_top(&body, &query.currency, offset)
    }

    async fn quotes(
        &self,
        symbols: &[String],
        currency: &str,
        credential: Option<&str>,
    ) -> Result<Vec<Listing>> {
        let up = self.upstream(PRICE_KEY_HINT);
        let fsyms = symbols
            .iter()
            .map(|s| s.to_uppercase())
            .collect::<Vec<_>>()
            .join(",");
        let params = vec![("fsyms", fsyms), ("tsyms", currency.to_uppercase())];
        let body = self.get("/data/pricemultifull", params, credential, &up).await?;

        if let Some(msg) = normalize::cryptocompare_error_message(&body) {
            return Err(Self::body_error(msg, Some(currency), &up));
        }
        let listings = normalize::from_cryptocompare_multi(&body, symbols, currency)?;
        if listings.is_empty() {
            return Err(Error::Provider {
                provider: up.provider,
                message: format!("no quotes for {}", symbols.join(",")),
            });
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up() -> Upstream {
        Upstream {
            provider: "CryptoCompare",
            hint: PRICE_KEY_HINT,
            timeout: Duration::from_secs(10),
            user_supplied_url: false,
        }
    }

    #[test]
    fn body_errors_are_classified_by_message() {
        assert!(matches!(
            CryptoCompare::body_error("You are over your rate limit".into(), None, &up()),
            Error::RateLimited { .. }
        ));
        assert!(matches!(
            CryptoCompare::body_error("You need a valid auth key or api key".into(), None, &up()),
            Error::Auth { .. }
        ));
        assert!(matches!(
            CryptoCompare::body_error("There is no data for the toSymbol XYZ .".into(), Some("xyz"), &up()),
            Error::UnsupportedCurrency { ref currency, .. } if currency == "XYZ"
        ));
        assert!(matches!(
            CryptoCompare::body_error("something odd".into(), Some("USD"), &up()),
            Error::Provider { .. }
        ));
    }
}
