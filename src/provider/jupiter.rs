use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::http::{self, Upstream};
use crate::error::{DATA_SETTINGS_HINT, Result};
use crate::model::TokenInfo;

pub const BASE_URL: &str = "https://tokens.jup.ag";

/// Jupiter verified Solana token list.
pub struct Jupiter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Jupiter {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn verified_tokens(&self) -> Result<Vec<TokenInfo>> {
        let up = Upstream {
            provider: "Jupiter",
            hint: DATA_SETTINGS_HINT,
            timeout: self.timeout,
            user_supplied_url: false,
        };

        let url = format!("{}/tokens", self.base_url);
        debug!(url = %url, "fetching token list from Jupiter");

        let (status, body) = http::send(self.client.get(&url).query(&[("tags", "verified")]), &up).await?;
        http::check_status(status, &body, &up)?;

        serde_json::from_str(&body).map_err(|e| http::parse_error(&up, e))
    }
}
