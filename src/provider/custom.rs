use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use super::NewsProviderId;
use super::http::{self, Upstream};
use super::newsapi::rejected_body;
use crate::error::{Error, NEWS_KEY_HINT, NEWS_URL_HINT, Result};
use crate::model::Article;
use crate::normalize::news::NewsPayload;

/// User-configured news endpoint of unknown shape.
pub struct CustomFeed {
    client: Client,
    timeout: Duration,
}

impl CustomFeed {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(8),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and shape-sniff the feed. The key, when set, is sent both as a bearer
    /// token and as `x-api-key`.
    pub async fn fetch(&self, url: &Url, api_key: Option<&str>) -> Result<Vec<Article>> {
        let provider = NewsProviderId::Custom.name();
        let up = Upstream {
            provider,
            hint: NEWS_URL_HINT,
            timeout: self.timeout,
            user_supplied_url: true,
        };

        debug!(url = %url, "fetching from custom news URL");

        let mut request = self.client.get(url.clone());
        if let Some(key) = api_key {
            request = request.bearer_auth(key).header("x-api-key", key);
        }

        let (status, body) = http::send(request, &up).await?;
        if let Some(err) = rejected_body(status, &body, provider) {
            return Err(err);
        }
        if matches!(status.as_u16(), 401 | 403) {
            return Err(Error::Auth {
                provider,
                hint: NEWS_KEY_HINT,
            });
        }
        http::check_status(status, &body, &up)?;

        NewsPayload::parse(&body)?.into_articles(provider, "custom")
    }
}

/// Validate a user-supplied news URL. A missing scheme defaults to `https://`.
pub fn parse_custom_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let invalid = || Error::InvalidCustomUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(&candidate).map_err(|_| invalid())?;
    match url.host_str() {
        Some(host) if !host.is_empty() && !trimmed.is_empty() => Ok(url),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_urls_get_https_by_default() {
        let url = parse_custom_url("api.example.com/news?limit=5").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/news?limit=5");

        let url = parse_custom_url("http://localhost:8080/feed").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn malformed_custom_urls_are_rejected() {
        for raw in ["not a url", "", "   ", "https://", "http://exa mple.com"] {
            assert!(
                matches!(parse_custom_url(raw), Err(Error::InvalidCustomUrl { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
