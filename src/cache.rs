//! Time-windowed in-process cache for news, image index and token list payloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::model::{Article, TokenInfo};

pub const IMAGES_KEY: &str = "images:coingecko";
pub const TOKENS_KEY: &str = "tokens:jupiter";

/// News cache key for a provider and chain filter (`news:cryptocompare:all`,
/// `news:newsapi:solana`, ...).
pub fn news_key(provider: &str, chain: &str) -> String {
    format!("news:{}:{}", provider, chain.to_lowercase())
}

/// Payloads the proxy caches. Values are shared, so a hit is a pointer copy.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Articles(Arc<Vec<Article>>),
    /// Lookup key to icon URL.
    Images(Arc<HashMap<String, String>>),
    Tokens(Arc<Vec<TokenInfo>>),
}

/// Storage strategy for the orchestrator. Expiry is the implementation's concern.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedPayload>;

    fn set(&self, key: &str, value: CachedPayload, ttl: Duration);

    /// Drop every entry regardless of key or age.
    fn invalidate_all(&self);
}

#[derive(Debug)]
struct Entry {
    value: CachedPayload,
    stored_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// `HashMap` behind a mutex, with expiry checked lazily on read.
///
/// Stale entries stay in memory until read again or until `invalidate_all`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<CachedPayload> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(Instant::now()) => {
                trace!(key, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                trace!(key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: CachedPayload, ttl: Duration) {
        trace!(key, ttl_secs = ttl.as_secs(), "cache store");
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        debug!(entries = entries.len(), "clearing cache");
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceInfo;

    fn articles(n: usize) -> CachedPayload {
        let items = (0..n)
            .map(|i| Article {
                id: i.to_string(),
                published_on: 0,
                title: format!("title {}", i),
                body: String::new(),
                url: String::new(),
                source_info: SourceInfo { name: "test".into() },
                categories: String::new(),
                imageurl: None,
            })
            .collect();
        CachedPayload::Articles(Arc::new(items))
    }

    #[test]
    fn get_returns_stored_value_within_ttl() {
        let cache = MemoryCache::new();
        assert!(cache.get("news:all").is_none());

        cache.set("news:all", articles(2), Duration::from_secs(60));
        assert_eq!(cache.get("news:all"), Some(articles(2)));

        cache.set("news:all", articles(3), Duration::from_secs(60));
        assert_eq!(cache.get("news:all"), Some(articles(3)));
    }

    #[test]
    fn zero_ttl_entries_are_never_served() {
        let cache = MemoryCache::new();
        cache.set("news:all", articles(1), Duration::ZERO);
        assert!(cache.get("news:all").is_none());
        // lazily expired, still stored
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set(IMAGES_KEY, articles(1), Duration::from_millis(50));
        assert!(cache.get(IMAGES_KEY).is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(IMAGES_KEY).is_none());
    }

    #[test]
    fn invalidate_all_clears_every_key() {
        let cache = MemoryCache::new();
        cache.set("news:all", articles(1), Duration::from_secs(60));
        cache.set(IMAGES_KEY, articles(1), Duration::from_secs(60));
        cache.set(TOKENS_KEY, articles(1), Duration::from_secs(60));

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get(IMAGES_KEY).is_none());
    }

    #[test]
    fn news_keys_are_lowercased_and_scoped_by_provider() {
        assert_eq!(news_key("cryptocompare", "Solana"), "news:cryptocompare:solana");
        assert_eq!(news_key("newsapi", "all"), "news:newsapi:all");
    }
}
