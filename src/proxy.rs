//! `MarketProxy`: provider selection, fallback, normalization and caching
//! behind every `/api` endpoint.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{self, Cache, CachedPayload, MemoryCache};
use crate::config::{AppConfig, CacheConfig, DEFAULT_CURRENCY};
use crate::error::{Error, FailureClass, NEWS_KEY_HINT, NEWS_URL_HINT, Result};
use crate::fallback::{self, PlanSuccess};
use crate::images::{self, IMAGE_PAGES};
use crate::model::{
    Article, HealthResponse, Listing, ListingsResponse, NewsResponse, QuotesResponse, ResponseStatus,
    TokensResponse,
};
use crate::news::{self, ChainFilter, NewsSource};
use crate::normalize::resolved_currency;
use crate::provider::{
    ListingsQuery, NewsProviderId, PriceProviderId, PriceSource, ProviderInfo, Providers,
};
use crate::store::{ConfigStore, NewsSettings, NewsUpdate, PriceUpdate};

const DEFAULT_START: u32 = 1;
const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct ListingsRequest {
    pub provider: Option<String>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
    pub convert: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuotesRequest {
    pub provider: Option<String>,
    /// Comma-separated symbols.
    pub symbols: String,
    pub convert: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsRequest {
    pub provider: Option<String>,
    pub chain: Option<String>,
    pub refresh: bool,
}

pub struct MarketProxy {
    providers: Providers,
    store: Arc<ConfigStore>,
    cache: Arc<dyn Cache>,
    ttls: CacheConfig,
    excluded_from_all: Vec<String>,
}

impl MarketProxy {
    pub fn new(providers: Providers, store: Arc<ConfigStore>, cache: Arc<dyn Cache>, config: &AppConfig) -> Self {
        Self {
            providers,
            store,
            cache,
            ttls: config.cache.clone(),
            excluded_from_all: config.news.excluded_from_all.clone(),
        }
    }

    /// Adapters, store and an in-memory cache, all built from one config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Providers::from_config(config)?,
            Arc::new(ConfigStore::from_config(config)?),
            Arc::new(MemoryCache::new()),
            config,
        ))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    // -----------------------------------------------------------------------
    // Listings and quotes
    // -----------------------------------------------------------------------

    /// Ranked listings from the effective provider, with one keyless fallback on
    /// transient failures. Never cached.
    pub async fn get_listings(&self, req: ListingsRequest) -> Result<ListingsResponse> {
        let started = Instant::now();
        let price = self.store.price();
        let primary = parse_override::<PriceProviderId>(req.provider.as_deref())?.unwrap_or(price.active);
        let query = ListingsQuery::new(
            req.start.unwrap_or(DEFAULT_START),
            req.limit.unwrap_or(DEFAULT_LIMIT),
            req.convert.as_deref().unwrap_or(DEFAULT_CURRENCY),
        );

        let credential = price.credential_for(primary);
        require_credential(primary.info(), credential)?;

        info!(
            provider = %primary,
            start = query.start,
            limit = query.limit,
            currency = %query.currency,
            "fetching listings"
        );

        let query_ref = &query;
        let outcome = fallback::listings_plan(primary)
            .run(move |step| async move {
                let credential = if step.keyless { None } else { credential };
                listings_in_currency(self.providers.price_source(step.provider), query_ref, credential).await
            })
            .await
            .map_err(|failure| failure.into_error())?;

        let PlanSuccess {
            data: (listings, substitution),
            provider,
            failures,
        } = outcome;

        let mut notice = match failures.first() {
            Some((_, err)) => format!("Using {} fallback data ({})", provider.name(), err.reason()),
            None => source_notice(provider),
        };
        let currency = resolved_currency(&listings, &query.currency);
        if let Some(note) = substitution {
            notice.push_str("; ");
            notice.push_str(&note);
        } else if currency != query.currency {
            notice.push_str(&format!("; {} not available, showing {}", query.currency, currency));
        }

        let data = self.merge_images(&listings).await;
        debug!(provider = %provider, count = data.len(), currency = %currency, "listings served");

        Ok(ListingsResponse {
            status: ResponseStatus::ok(notice, elapsed_ms(started)),
            data,
        })
    }

    /// Listings for specific symbols keyed by symbol. CoinMarketCap is the
    /// primary when its key is configured; CoinGecko answers otherwise and is the
    /// single fallback.
    pub async fn get_quotes(&self, req: QuotesRequest) -> Result<QuotesResponse> {
        let started = Instant::now();
        let symbols = parse_symbols(&req.symbols)?;
        let currency = req
            .convert
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_uppercase();
        let price = self.store.price();

        let plan = match parse_override::<PriceProviderId>(req.provider.as_deref())? {
            Some(id) => {
                require_credential(id.info(), price.credential_for(id))?;
                fallback::quotes_plan(id, true)
            }
            None => {
                let cmc = PriceProviderId::CoinMarketCap;
                fallback::quotes_plan(cmc, price.credential_for(cmc).is_some())
            }
        };

        info!(provider = %plan.primary(), symbols = ?symbols, currency = %currency, "fetching quotes");

        let (price_ref, symbols_ref, currency_ref) = (&price, &symbols, currency.as_str());
        let outcome = plan
            .run(move |step| async move {
                let credential = if step.keyless {
                    None
                } else {
                    price_ref.credential_for(step.provider)
                };
                quotes_in_currency(
                    self.providers.price_source(step.provider),
                    symbols_ref,
                    currency_ref,
                    credential,
                )
                .await
            })
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(failure) => {
                let auth = failure
                    .failures
                    .last()
                    .is_some_and(|(_, err)| err.class() == FailureClass::Auth);
                return Err(if auth {
                    failure.into_error()
                } else {
                    failure.into_unavailable()
                });
            }
        };

        let PlanSuccess {
            data: (listings, substitution),
            provider,
            failures,
        } = outcome;

        let mut notice = match failures.first() {
            Some((_, err)) => format!("Using {} fallback data ({})", provider.name(), err.reason()),
            None => source_notice(provider),
        };
        if let Some(note) = substitution {
            notice.push_str("; ");
            notice.push_str(&note);
        }

        let mut data = BTreeMap::new();
        for listing in listings {
            data.entry(listing.symbol.to_uppercase()).or_insert(listing);
        }

        Ok(QuotesResponse {
            status: ResponseStatus::ok(notice, elapsed_ms(started)),
            data,
        })
    }

    // -----------------------------------------------------------------------
    // News
    // -----------------------------------------------------------------------

    /// Articles for a chain filter, served from cache unless `refresh` is set.
    pub async fn get_news(&self, req: NewsRequest) -> Result<NewsResponse> {
        let filter = ChainFilter::new(req.chain.as_deref(), &self.excluded_from_all);
        let settings = self.store.news();
        let active = parse_override::<NewsProviderId>(req.provider.as_deref())?.unwrap_or(settings.active);
        let key = cache::news_key(active.as_str(), filter.key());

        if !req.refresh
            && let Some(CachedPayload::Articles(articles)) = self.cache.get(&key)
        {
            debug!(key = %key, count = articles.len(), "serving news from cache");
            return Ok(NewsResponse {
                data: articles.as_ref().clone(),
            });
        }

        info!(provider = %active, chain = filter.key(), refresh = req.refresh, "fetching news");

        let (settings_ref, filter_ref) = (&settings, &filter);
        let PlanSuccess {
            data: articles,
            provider,
            failures,
        } = fallback::news_plan(active)
            .run(move |step| async move { self.fetch_news(step.provider, settings_ref, filter_ref).await })
            .await
            .map_err(|failure| failure.into_error())?;

        if let Some((failed, err)) = failures.first() {
            warn!(provider = %failed, error = %err, "default news wire failed, serving {}", provider);
        }

        let filtered = filter.apply(&articles);
        if filtered.is_empty() {
            debug!(key = %key, "no articles left after filtering, not caching");
        } else {
            self.cache.set(
                &key,
                CachedPayload::Articles(Arc::new(filtered.clone())),
                self.ttls.news_ttl(),
            );
        }

        debug!(source = %provider, fetched = articles.len(), served = filtered.len(), "news served");
        Ok(NewsResponse { data: filtered })
    }

    async fn fetch_news(&self, source: NewsSource, settings: &NewsSettings, filter: &ChainFilter) -> Result<Vec<Article>> {
        let articles = match source {
            NewsSource::NewsApi => {
                let key = news_credential(settings, NewsProviderId::NewsApi).ok_or(Error::MissingCredential {
                    provider: source.name(),
                    hint: NEWS_KEY_HINT,
                })?;
                let query = match filter {
                    ChainFilter::Only(chain) => chain.as_str(),
                    ChainFilter::All { .. } => "crypto",
                };
                self.providers.newsapi.everything(query, key).await?
            }
            NewsSource::Custom => {
                let url = settings.custom_url.as_ref().ok_or_else(|| {
                    Error::BadRequest(format!("no custom news URL configured, set one in {}", NEWS_URL_HINT))
                })?;
                self.providers
                    .custom
                    .fetch(url, news_credential(settings, NewsProviderId::Custom))
                    .await
                    .map_err(custom_feed_error)?
            }
            NewsSource::CryptoCompare => {
                let credential = news_credential(settings, NewsProviderId::CryptoCompare);
                self.providers.cryptocompare.news(credential).await?
            }
            NewsSource::Static => news::static_articles(chrono::Utc::now().timestamp()),
        };

        if articles.is_empty() {
            return Err(Error::NoArticles {
                provider: source.name(),
            });
        }
        Ok(articles)
    }

    // -----------------------------------------------------------------------
    // Images and tokens
    // -----------------------------------------------------------------------

    /// Copy of `listings` with icons from the CoinGecko index. A failed index
    /// fetch leaves the listings as they were.
    pub async fn merge_images(&self, listings: &[Listing]) -> Vec<Listing> {
        if listings.is_empty() || images::all_have_images(listings) {
            return listings.to_vec();
        }
        match self.image_index().await {
            Some(index) => images::merge(listings, &index),
            None => listings.to_vec(),
        }
    }

    async fn image_index(&self) -> Option<Arc<HashMap<String, String>>> {
        if let Some(CachedPayload::Images(index)) = self.cache.get(cache::IMAGES_KEY) {
            return Some(index);
        }

        let pages = join_all((1..=IMAGE_PAGES).map(|page| self.providers.coingecko.market_page(page))).await;
        let mut markets = Vec::new();
        let mut complete = true;
        for (page, result) in (1..=IMAGE_PAGES).zip(pages) {
            match result {
                Ok(rows) => markets.extend(rows),
                Err(e) => {
                    complete = false;
                    warn!(page, error = %e, "image page fetch failed");
                }
            }
        }
        if markets.is_empty() {
            return None;
        }

        let index = Arc::new(images::build_index(&markets));
        debug!(entries = index.len(), complete, "image index built");
        // a partial index is used for this request only, so the next one retries
        if complete {
            self.cache.set(
                cache::IMAGES_KEY,
                CachedPayload::Images(Arc::clone(&index)),
                self.ttls.images_ttl(),
            );
        }
        Some(index)
    }

    /// Jupiter's verified Solana tokens, cached for an hour.
    pub async fn solana_tokens(&self) -> Result<TokensResponse> {
        if let Some(CachedPayload::Tokens(tokens)) = self.cache.get(cache::TOKENS_KEY) {
            return Ok(TokensResponse::from_tokens(&tokens));
        }

        let tokens = Arc::new(self.providers.jupiter.verified_tokens().await?);
        info!(count = tokens.len(), "fetched verified token list");
        self.cache.set(
            cache::TOKENS_KEY,
            CachedPayload::Tokens(Arc::clone(&tokens)),
            self.ttls.tokens_ttl(),
        );
        Ok(TokensResponse::from_tokens(&tokens))
    }

    // -----------------------------------------------------------------------
    // Single coin
    // -----------------------------------------------------------------------

    /// CoinGecko coin detail by id, or by symbol resolved through search.
    pub async fn coin_detail(&self, id: Option<&str>, symbol: Option<&str>) -> Result<serde_json::Value> {
        let id = match (non_blank(id), non_blank(symbol)) {
            (Some(id), _) => id.to_lowercase(),
            (None, Some(symbol)) => self
                .providers
                .coingecko
                .search_coin_id(symbol)
                .await?
                .ok_or_else(|| Error::BadRequest(format!("no CoinGecko coin matches symbol '{}'", symbol)))?,
            (None, None) => return Err(Error::BadRequest("id or symbol parameter is required".into())),
        };
        self.providers.coingecko.coin_detail(&id).await
    }

    pub async fn coin_market(&self, id: Option<&str>, convert: Option<&str>) -> Result<serde_json::Value> {
        let id = non_blank(id).ok_or_else(|| Error::BadRequest("id parameter is required".into()))?;
        let currency = non_blank(convert).unwrap_or(DEFAULT_CURRENCY);
        self.providers.coingecko.coin_market(&id.to_lowercase(), currency).await
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn update_price_config(&self, update: PriceUpdate) -> Result<()> {
        self.store.update_price(update).map(|_| ())
    }

    /// Apply a news settings change, then drop every cached entry.
    pub fn update_news_config(&self, update: NewsUpdate) -> Result<()> {
        self.store.update_news(update)?;
        self.cache.invalidate_all();
        info!("cache cleared after news settings change");
        Ok(())
    }

    pub fn health(&self) -> HealthResponse {
        let active = self.store.price().active;
        let fallback = fallback::listings_plan(active)
            .steps()
            .get(1)
            .map(|step| step.provider.name())
            .unwrap_or("none");
        HealthResponse {
            status: "OK",
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            api: format!("{} (with {} fallback)", active.name(), fallback),
            version: crate::VERSION,
        }
    }
}

/// Listings in the requested currency, retried once in USD when the provider
/// rejects the currency.
async fn listings_in_currency(
    source: &dyn PriceSource,
    query: &ListingsQuery,
    credential: Option<&str>,
) -> Result<(Vec<Listing>, Option<String>)> {
    match source.listings(query, credential).await {
        Err(Error::UnsupportedCurrency { provider, currency }) if query.currency != DEFAULT_CURRENCY => {
            warn!(provider, currency = %currency, "currency not supported, retrying in {}", DEFAULT_CURRENCY);
            let listings = source
                .listings(&query.in_currency(DEFAULT_CURRENCY), credential)
                .await?;
            Ok((listings, Some(currency_note(&currency, provider))))
        }
        other => other.map(|listings| (listings, None)),
    }
}

/// Quotes in the requested currency, retried once in USD when the provider
/// rejects the currency.
async fn quotes_in_currency(
    source: &dyn PriceSource,
    symbols: &[String],
    currency: &str,
    credential: Option<&str>,
) -> Result<(Vec<Listing>, Option<String>)> {
    match source.quotes(symbols, currency, credential).await {
        Err(Error::UnsupportedCurrency { provider, currency: rejected }) if rejected != DEFAULT_CURRENCY => {
            warn!(provider, currency = %rejected, "currency not supported, retrying in {}", DEFAULT_CURRENCY);
            let listings = source.quotes(symbols, DEFAULT_CURRENCY, credential).await?;
            Ok((listings, Some(currency_note(&rejected, provider))))
        }
        other => other.map(|listings| (listings, None)),
    }
}

fn currency_note(currency: &str, provider: &str) -> String {
    format!("{} not supported by {}, showing {}", currency, provider, DEFAULT_CURRENCY)
}

fn source_notice(provider: PriceProviderId) -> String {
    match provider {
        PriceProviderId::CoinGecko => "Using CoinGecko data (default)".to_string(),
        other => format!("Using {} data", other.name()),
    }
}

/// The news key belongs to whichever provider was selected with it.
fn news_credential(settings: &NewsSettings, provider: NewsProviderId) -> Option<&str> {
    settings.credential.as_deref().filter(|_| settings.active == provider)
}

/// Fail before any outbound call when a keyed provider has no key.
fn require_credential(info: &ProviderInfo, credential: Option<&str>) -> Result<()> {
    if info.requires_credential && credential.is_none() {
        return Err(Error::MissingCredential {
            provider: info.name,
            hint: info.hint,
        });
    }
    Ok(())
}

/// Custom feed failures other than auth, reachability, rejection and emptiness
/// are reported as a generic custom URL failure.
fn custom_feed_error(err: Error) -> Error {
    match err {
        Error::Auth { .. }
        | Error::UnreachableHost { .. }
        | Error::Rejected { .. }
        | Error::NoArticles { .. }
        | Error::InvalidCustomUrl { .. } => err,
        other => Error::CustomFeed {
            message: other.to_string(),
        },
    }
}

fn parse_override<T: FromStr<Err = Error>>(raw: Option<&str>) -> Result<Option<T>> {
    non_blank(raw).map(str::parse::<T>).transpose()
}

fn parse_symbols(raw: &str) -> Result<Vec<String>> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let upper = symbol.to_uppercase();
        if !symbols.contains(&upper) {
            symbols.push(upper);
        }
    }
    if symbols.is_empty() {
        return Err(Error::BadRequest("symbol parameter is required".into()));
    }
    Ok(symbols)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
