use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::NewsProviderId;
use super::http::{self, Upstream};
use crate::error::{Error, NEWS_KEY_HINT, Result};
use crate::model::Article;
use crate::normalize::news::NewsPayload;

pub const BASE_URL: &str = "https://newsapi.org/v2";

const PAGE_SIZE: u32 = 10;

/// NewsAPI `/everything` search -- requires an API key.
pub struct NewsApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl NewsApi {
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

    /// Newest English articles matching `query`.
    ///
    /// Body-level `{"status":"error"}` responses surface as `Error::Rejected`; an
    /// empty article list is returned as-is for the caller to judge.
    pub async fn everything(&self, query: &str, api_key: &str) -> Result<Vec<Article>> {
        let up = Upstream {
            provider: NewsProviderId::NewsApi.name(),
            hint: NEWS_KEY_HINT,
            timeout: self.timeout,
            user_supplied_url: false,
        };

        let url = format!("{}/everything", self.base_url);
        debug!(url = %url, query = %query, "fetching from NewsAPI");

        let params = [
            ("q", query.to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("language", "en".to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
            ("apiKey", api_key.to_string()),
        ];
        let (status, body) = http::send(self.client.get(&url).query(&params), &up).await?;
        if let Some(err) = rejected_body(status, &body, up.provider) {
            return Err(err);
        }
        http::check_status(status, &body, &up)?;

        NewsPayload::parse(&body)?.into_articles(up.provider, "newsapi")
    }
}

/// A 4xx (other than auth and rate limiting) carrying a NewsAPI-style error
/// envelope is the provider's own verdict on the request.
pub(crate) fn rejected_body(status: StatusCode, body: &str, provider: &'static str) -> Option<Error> {
    let code = status.as_u16();
    if !(400..500).contains(&code) || matches!(code, 401 | 403 | 429) {
        return None;
    }
    match NewsPayload::parse(body) {
        Ok(NewsPayload::ProviderError { message }) => Some(Error::Rejected { provider, message }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_body_only_reads_client_errors_with_an_envelope() {
        let body = r#"{"status":"error","code":"parameterInvalid","message":"bad q"}"#;
        assert!(matches!(
            rejected_body(StatusCode::BAD_REQUEST, body, "NewsAPI"),
            Some(Error::Rejected { ref message, .. }) if message == "bad q"
        ));
        assert!(rejected_body(StatusCode::UNAUTHORIZED, body, "NewsAPI").is_none());
        assert!(rejected_body(StatusCode::INTERNAL_SERVER_ERROR, body, "NewsAPI").is_none());
        assert!(rejected_body(StatusCode::BAD_REQUEST, "plain text", "NewsAPI").is_none());
    }
}
