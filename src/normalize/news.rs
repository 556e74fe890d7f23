//! News payload detection and mapping onto [`Article`].
//!
//! Upstream news comes in a handful of shapes. [`NewsPayload::classify`] matches a
//! decoded body against them in a fixed priority order:
//!
//! 1. error envelope (`{"status":"error"}` or `{"Response":"Error"}`)
//! 2. NewsAPI (`{"articles":[...]}`)
//! 3. CryptoCompare (`{"Data":[...]}`)
//! 4. bare array
//! 5. anything else, treated as a single article object

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Article, SourceInfo};

const NEWSAPI_CATEGORIES: &str = "Crypto|News";
const DEFAULT_BODY: &str = "Click to read more.";
const DEFAULT_TITLE: &str = "Untitled";

#[derive(Debug, Clone, PartialEq)]
pub enum NewsPayload {
    ProviderError { message: String },
    NewsApi(Vec<NewsApiArticle>),
    CryptoCompare(Vec<Value>),
    RawArray(Vec<Value>),
    RawObject(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsApiArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<NewsApiSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewsApiSource {
    pub name: Option<String>,
}

impl NewsPayload {
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| Error::Parse(format!("news JSON: {}", e)))?;
        Ok(Self::classify(value))
    }

    pub fn classify(value: Value) -> Self {
        let map = match value {
            Value::Array(items) => return Self::RawArray(items),
            Value::Object(map) => map,
            other => return Self::RawObject(other),
        };

        let is_error = map.get("status").and_then(Value::as_str) == Some("error")
            || map.get("Response").and_then(Value::as_str) == Some("Error");
        if is_error {
            let message = ["message", "Message", "code"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .unwrap_or("Invalid API key or request parameters")
                .to_string();
            return Self::ProviderError { message };
        }

        if let Some(Value::Array(articles)) = map.get("articles") {
            return Self::NewsApi(
                articles
                    .iter()
                    .map(|a| serde_json::from_value(a.clone()).unwrap_or_default())
                    .collect(),
            );
        }

        if let Some(Value::Array(data)) = map.get("Data") {
            return Self::CryptoCompare(data.clone());
        }

        Self::RawObject(Value::Object(map))
    }

    /// Normalize into canonical articles. `origin` prefixes synthesized ids and
    /// names the source when an item carries none.
    pub fn into_articles(self, provider: &'static str, origin: &str) -> Result<Vec<Article>> {
        let articles = match self {
            Self::ProviderError { message } => return Err(Error::Rejected { provider, message }),
            Self::NewsApi(items) => items.into_iter().enumerate().map(|(i, a)| from_newsapi(i, a)).collect(),
            Self::CryptoCompare(items) | Self::RawArray(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| from_value(i, v, origin))
                .collect(),
            Self::RawObject(value) => vec![from_value(0, &value, origin)],
        };
        Ok(dedupe_ids(articles))
    }
}

fn from_newsapi(index: usize, a: NewsApiArticle) -> Article {
    Article {
        id: format!("newsapi-{}", index),
        published_on: a.published_at.as_deref().map(parse_timestamp).unwrap_or(0),
        title: non_blank(a.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: non_blank(a.description)
            .or_else(|| non_blank(a.content))
            .unwrap_or_else(|| DEFAULT_BODY.to_string()),
        url: a.url.unwrap_or_default(),
        source_info: SourceInfo {
            name: a
                .source
                .and_then(|s| non_blank(s.name))
                .unwrap_or_else(|| "NewsAPI".to_string()),
        },
        categories: NEWSAPI_CATEGORIES.to_string(),
        imageurl: a.url_to_image,
    }
}

fn from_value(index: usize, v: &Value, origin: &str) -> Article {
    let id = match v.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("{}-{}", origin, index),
    };

    let published_on = match v.get("published_on") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or_else(|_| parse_timestamp(s)),
        _ => first_text(v, &["publishedAt", "published_at", "date"])
            .map(|s| parse_timestamp(&s))
            .unwrap_or(0),
    };

    let source = v
        .get("source_info")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .or_else(|| v.get("source").and_then(|s| s.get("name")).and_then(Value::as_str))
        .or_else(|| v.get("source").and_then(Value::as_str))
        .unwrap_or(origin);

    Article {
        id,
        published_on,
        title: first_text(v, &["title", "headline"]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: first_text(v, &["body", "description", "content", "summary"])
            .unwrap_or_else(|| DEFAULT_BODY.to_string()),
        url: first_text(v, &["url", "link", "guid"]).unwrap_or_default(),
        source_info: SourceInfo {
            name: source.to_string(),
        },
        categories: first_text(v, &["categories", "category", "tags"])
            .unwrap_or_else(|| NEWSAPI_CATEGORIES.to_string()),
        imageurl: first_text(v, &["imageurl", "urlToImage", "image"]),
    }
}

fn first_text(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| v.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Make ids unique within one batch by appending the timestamp, then the position.
fn dedupe_ids(mut articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    for (i, article) in articles.iter_mut().enumerate() {
        if seen.insert(article.id.clone()) {
            continue;
        }
        let with_ts = format!("{}-{}", article.id, article.published_on);
        article.id = if seen.contains(&with_ts) {
            format!("{}-{}", with_ts, i)
        } else {
            with_ts
        };
        seen.insert(article.id.clone());
    }
    articles
}

/// RFC 3339 timestamp to epoch seconds; unparseable input maps to 0.
pub fn parse_timestamp(raw: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newsapi_shape_is_normalized_with_index_ids() {
        let payload = NewsPayload::classify(json!({
            "status": "ok",
            "articles": [{
                "title": "A",
                "publishedAt": "2024-01-01T00:00:00Z",
                "source": { "name": "X" }
            }]
        }));
        assert!(matches!(payload, NewsPayload::NewsApi(ref a) if a.len() == 1));

        let articles = payload.into_articles("custom news", "custom").unwrap();
        let a = &articles[0];
        assert_eq!(a.id, "newsapi-0");
        assert_eq!(a.title, "A");
        assert_eq!(a.published_on, 1_704_067_200);
        assert_eq!(a.source_info.name, "X");
        assert_eq!(a.body, "Click to read more.");
        assert_eq!(a.categories, "Crypto|News");
    }

    #[test]
    fn error_envelopes_take_priority_over_articles() {
        let payload = NewsPayload::classify(json!({
            "status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid.", "articles": []
        }));
        assert_eq!(
            payload,
            NewsPayload::ProviderError {
                message: "Your API key is invalid.".into()
            }
        );
        let err = payload.into_articles("NewsAPI", "newsapi").unwrap_err();
        assert!(matches!(err, Error::Rejected { provider: "NewsAPI", .. }));

        let cc = NewsPayload::classify(json!({ "Response": "Error", "Message": "rate limit", "Data": [] }));
        assert!(matches!(cc, NewsPayload::ProviderError { ref message } if message == "rate limit"));
    }

    #[test]
    fn cryptocompare_shape_passes_native_fields_through() {
        let payload = NewsPayload::classify(json!({
            "Type": 100,
            "Data": [{
                "id": 42, "published_on": 1700000000, "title": "T", "body": "B",
                "url": "https://u", "source_info": { "name": "CoinDesk" }, "categories": "BTC|Markets",
                "imageurl": "https://img"
            }]
        }));
        let articles = payload.into_articles("CryptoCompare", "cryptocompare").unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "42");
        assert_eq!(articles[0].published_on, 1_700_000_000);
        assert_eq!(articles[0].source_info.name, "CoinDesk");
        assert_eq!(articles[0].categories, "BTC|Markets");
        assert_eq!(articles[0].imageurl.as_deref(), Some("https://img"));
    }

    #[test]
    fn raw_array_and_object_are_wrapped() {
        let arr = NewsPayload::classify(json!([{ "headline": "H1" }, { "title": "T2", "source": "Feed" }]));
        let articles = arr.into_articles("custom news", "custom").unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "custom-0");
        assert_eq!(articles[0].title, "H1");
        assert_eq!(articles[0].source_info.name, "custom");
        assert_eq!(articles[1].source_info.name, "Feed");

        let obj = NewsPayload::classify(json!({ "title": "Solo", "publishedAt": "2024-01-01T00:00:00Z" }));
        assert!(matches!(obj, NewsPayload::RawObject(_)));
        let articles = obj.into_articles("custom news", "custom").unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].published_on, 1_704_067_200);
    }

    #[test]
    fn duplicate_ids_are_made_unique() {
        let payload = NewsPayload::classify(json!([
            { "id": "same", "published_on": 1 },
            { "id": "same", "published_on": 2 },
            { "id": "same", "published_on": 2 }
        ]));
        let ids: Vec<String> = payload
            .into_articles("custom news", "custom")
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["same", "same-2", "same-2-2"]);
    }

    #[test]
    fn unparseable_timestamps_become_zero() {
        assert_eq!(parse_timestamp("yesterday"), 0);
        assert_eq!(parse_timestamp("2024-01-01T00:00:00+00:00"), 1_704_067_200);
    }
}
