//! Runtime provider selection and credentials, shared by every request.
//!
//! Price and news settings sit behind separate locks. Readers take a cloned
//! snapshot, so no lock is held across an upstream call and an update never
//! waits on in-flight requests.

use parking_lot::RwLock;
use tracing::info;
use url::Url;

use crate::config::{AppConfig, non_empty};
use crate::error::Result;
use crate::provider::custom::parse_custom_url;
use crate::provider::{NewsProviderId, PriceProviderId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSettings {
    pub active: PriceProviderId,
    pub credential: Option<String>,
    /// CoinMarketCap key, kept apart so quotes can use CMC whatever the active provider.
    pub cmc_credential: Option<String>,
}

impl PriceSettings {
    /// Credential to send to `id`. CoinGecko only receives the shared key while it
    /// is the active provider, so a CMC or CryptoCompare key never leaks to it.
    pub fn credential_for(&self, id: PriceProviderId) -> Option<&str> {
        match id {
            PriceProviderId::CoinMarketCap => self
                .cmc_credential
                .as_deref()
                .or_else(|| self.credential.as_deref().filter(|_| self.active == id)),
            PriceProviderId::CoinGecko if self.active != id => None,
            _ => self.credential.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsSettings {
    pub active: NewsProviderId,
    pub credential: Option<String>,
    /// Set only while `active` is `Custom`.
    pub custom_url: Option<Url>,
}

/// Body of a price configuration update.
#[derive(Debug, Clone, Default)]
pub struct PriceUpdate {
    /// `None` keeps the active provider.
    pub provider: Option<String>,
    /// Blank or absent clears the credential.
    pub api_key: Option<String>,
}

/// Body of a news configuration update.
#[derive(Debug, Clone, Default)]
pub struct NewsUpdate {
    /// `None` resets to the default provider.
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub custom_url: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConfigStore {
    price: RwLock<PriceSettings>,
    news: RwLock<NewsSettings>,
    /// CMC key from startup configuration, restored when the user clears theirs.
    startup_cmc_credential: Option<String>,
}

impl ConfigStore {
    pub fn new(price: PriceSettings, news: NewsSettings) -> Self {
        Self {
            startup_cmc_credential: price.cmc_credential.clone(),
            price: RwLock::new(price),
            news: RwLock::new(news),
        }
    }

    /// Seed from startup configuration. An invalid custom URL is rejected here too.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let price = PriceSettings {
            active: config.price.provider,
            credential: non_empty(config.price.api_key.clone()),
            cmc_credential: non_empty(config.price.cmc_api_key.clone()),
        };

        let custom_url = non_empty(config.news.custom_url.clone())
            .map(|raw| parse_custom_url(&raw))
            .transpose()?;
        let active = match (config.news.provider, &custom_url) {
            (NewsProviderId::Custom, None) => NewsProviderId::CryptoCompare,
            (id, _) => id,
        };
        let news = NewsSettings {
            active,
            credential: non_empty(config.news.api_key.clone()),
            custom_url: custom_url.filter(|_| active == NewsProviderId::Custom),
        };

        Ok(Self::new(price, news))
    }

    pub fn price(&self) -> PriceSettings {
        self.price.read().clone()
    }

    pub fn news(&self) -> NewsSettings {
        self.news.read().clone()
    }

    /// Replace the price provider and credential. Choosing `cmc` also seeds the
    /// CMC slot; clearing the key while on `cmc` restores the startup CMC key.
    pub fn update_price(&self, update: PriceUpdate) -> Result<PriceSettings> {
        let provider = update
            .provider
            .as_deref()
            .map(str::parse::<PriceProviderId>)
            .transpose()?;
        let key = non_empty(update.api_key);

        let mut guard = self.price.write();
        let mut next = guard.clone();
        if let Some(id) = provider {
            next.active = id;
        }
        next.credential = key.clone();
        if provider == Some(PriceProviderId::CoinMarketCap) {
            next.cmc_credential = key.or_else(|| self.startup_cmc_credential.clone());
        }

        info!(
            provider = %next.active,
            credential = next.credential.is_some(),
            cmc_credential = next.cmc_credential.is_some(),
            "price provider settings updated"
        );
        *guard = next.clone();
        Ok(next)
    }

    /// Replace the news provider, credential and custom URL. The custom URL is
    /// validated before anything changes; on error the old settings stay.
    pub fn update_news(&self, update: NewsUpdate) -> Result<NewsSettings> {
        let provider = match update.provider.as_deref().map(str::trim) {
            None | Some("") => NewsProviderId::default(),
            Some(raw) => raw.parse::<NewsProviderId>()?,
        };
        let custom_url = match (provider, non_empty(update.custom_url)) {
            (NewsProviderId::Custom, Some(raw)) => Some(parse_custom_url(&raw)?),
            _ => None,
        };
        // custom without a URL falls back to the default wire
        let active = match (provider, &custom_url) {
            (NewsProviderId::Custom, None) => NewsProviderId::CryptoCompare,
            (id, _) => id,
        };

        let next = NewsSettings {
            active,
            credential: non_empty(update.api_key),
            custom_url,
        };
        info!(
            provider = %next.active,
            credential = next.credential.is_some(),
            custom_url = next.custom_url.as_ref().map(Url::as_str),
            "news provider settings updated"
        );
        *self.news.write() = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn store() -> ConfigStore {
        ConfigStore::new(
            PriceSettings {
                cmc_credential: Some("startup-cmc".into()),
                ..PriceSettings::default()
            },
            NewsSettings::default(),
        )
    }

    #[test]
    fn selecting_cmc_seeds_the_cmc_slot() {
        let store = store();
        store
            .update_price(PriceUpdate {
                provider: Some("cmc".into()),
                api_key: Some(" user-key ".into()),
            })
            .unwrap();

        let price = store.price();
        assert_eq!(price.active, PriceProviderId::CoinMarketCap);
        assert_eq!(price.credential.as_deref(), Some("user-key"));
        assert_eq!(price.credential_for(PriceProviderId::CoinMarketCap), Some("user-key"));
    }

    #[test]
    fn clearing_cmc_key_restores_startup_key() {
        let store = store();
        store
            .update_price(PriceUpdate {
                provider: Some("cmc".into()),
                api_key: Some("user-key".into()),
            })
            .unwrap();
        store
            .update_price(PriceUpdate {
                provider: Some("cmc".into()),
                api_key: Some("".into()),
            })
            .unwrap();

        let price = store.price();
        assert_eq!(price.credential, None);
        assert_eq!(price.cmc_credential.as_deref(), Some("startup-cmc"));
    }

    #[test]
    fn coingecko_only_gets_the_key_while_active() {
        let settings = PriceSettings {
            active: PriceProviderId::CryptoCompare,
            credential: Some("cc-key".into()),
            cmc_credential: None,
        };
        assert_eq!(settings.credential_for(PriceProviderId::CryptoCompare), Some("cc-key"));
        assert_eq!(settings.credential_for(PriceProviderId::CoinGecko), None);
        assert_eq!(settings.credential_for(PriceProviderId::CoinMarketCap), None);
    }

    #[test]
    fn unknown_price_provider_leaves_settings_untouched() {
        let store = store();
        let before = store.price();
        let err = store
            .update_price(PriceUpdate {
                provider: Some("kraken".into()),
                api_key: Some("k".into()),
            })
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(store.price(), before);
    }

    #[test]
    fn custom_news_url_is_normalized() {
        let store = store();
        let news = store
            .update_news(NewsUpdate {
                provider: Some("custom".into()),
                api_key: Some("secret".into()),
                custom_url: Some("feeds.example.com/latest".into()),
            })
            .unwrap();

        assert_eq!(news.active, NewsProviderId::Custom);
        assert_eq!(
            news.custom_url.map(|u| u.to_string()).as_deref(),
            Some("https://feeds.example.com/latest")
        );
    }

    #[test]
    fn malformed_custom_url_keeps_previous_news_settings() {
        let store = store();
        store
            .update_news(NewsUpdate {
                provider: Some("newsapi".into()),
                api_key: Some("na-key".into()),
                custom_url: None,
            })
            .unwrap();
        let before = store.news();

        let err = store
            .update_news(NewsUpdate {
                provider: Some("custom".into()),
                api_key: None,
                custom_url: Some("not a url".into()),
            })
            .unwrap_err();

        assert!(matches!(err, Error::InvalidCustomUrl { .. }));
        assert_eq!(store.news(), before);
    }

    #[test]
    fn custom_without_url_resets_to_default_wire() {
        let store = store();
        let news = store
            .update_news(NewsUpdate {
                provider: Some("custom".into()),
                api_key: None,
                custom_url: Some("  ".into()),
            })
            .unwrap();
        assert_eq!(news.active, NewsProviderId::CryptoCompare);
        assert!(news.custom_url.is_none());
    }
}
