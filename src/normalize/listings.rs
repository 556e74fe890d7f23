//! Provider-native listing payloads and their mapping onto [`Listing`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Listing, Quote};

const CRYPTOCOMPARE_MEDIA_URL: &str = "https://www.cryptocompare.com";

// ---------------------------------------------------------------------------
// CoinGecko
// ---------------------------------------------------------------------------

/// One row of CoinGecko `/coins/markets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub fully_diluted_valuation: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d_in_currency: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub last_updated: Option<String>,
}

pub fn parse_coingecko_markets(body: &str) -> Result<Vec<CoinGeckoMarket>> {
    serde_json::from_str(body).map_err(|e| Error::Parse(format!("CoinGecko JSON: {}", e)))
}

/// 1-based rank of the `index`-th row after `offset`, clamped at `u32::MAX`.
fn position_rank(offset: u32, index: usize) -> u32 {
    let index = u32::try_from(index).unwrap_or(u32::MAX);
    offset.saturating_add(index).saturating_add(1)
}

/// Map CoinGecko markets to listings. `offset` is the rank of the entry before the first row.
pub fn from_coingecko(markets: Vec<CoinGeckoMarket>, currency: &str, offset: u32) -> Vec<Listing> {
    markets
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let quote = Quote {
                price: m.current_price,
                volume_24h: m.total_volume,
                percent_change_24h: m.price_change_percentage_24h,
                percent_change_7d: m.price_change_percentage_7d_in_currency,
                market_cap: m.market_cap,
                fully_diluted_market_cap: m.fully_diluted_valuation,
                last_updated: m.last_updated.clone(),
            };
            Listing {
                slug: m.id.clone(),
                id: m.id,
                name: m.name,
                symbol: m.symbol.to_uppercase(),
                rank: Some(m.market_cap_rank.unwrap_or_else(|| position_rank(offset, i))),
                circulating_supply: m.circulating_supply,
                total_supply: m.total_supply,
                max_supply: m.max_supply,
                last_updated: m.last_updated,
                image: m.image,
                quote: BTreeMap::from([(currency.to_uppercase(), quote)]),
            }
        })
        .collect()
}

/// Keep the first (highest market cap) row for each requested symbol.
pub fn coingecko_quotes(markets: Vec<CoinGeckoMarket>, symbols: &[String], currency: &str) -> Vec<Listing> {
    let wanted: HashSet<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
    let mut seen = HashSet::new();
    let rows: Vec<CoinGeckoMarket> = markets
        .into_iter()
        .filter(|m| {
            let sym = m.symbol.to_uppercase();
            wanted.contains(&sym) && seen.insert(sym)
        })
        .collect();
    from_coingecko(rows, currency, 0)
}

// ---------------------------------------------------------------------------
// CoinMarketCap
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CmcStatus {
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CmcListingsResponse {
    status: Option<CmcStatus>,
    #[serde(default)]
    data: Vec<CmcCoin>,
}

#[derive(Debug, Deserialize)]
struct CmcQuotesResponse {
    status: Option<CmcStatus>,
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CmcCoin {
    id: serde_json::Value,
    name: String,
    symbol: String,
    slug: Option<String>,
    cmc_rank: Option<u32>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
    last_updated: Option<String>,
    #[serde(default)]
    quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    price: Option<f64>,
    volume_24h: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_7d: Option<f64>,
    market_cap: Option<f64>,
    fully_diluted_market_cap: Option<f64>,
    last_updated: Option<String>,
}

/// Body-level CMC error message, if any.
pub fn cmc_error_message(status: Option<&CmcStatus>) -> Option<String> {
    let st = status?;
    let msg = st.error_message.as_deref().unwrap_or("").trim();
    if !msg.is_empty() && st.error_code.unwrap_or(0) != 0 {
        Some(msg.to_string())
    } else {
        None
    }
}

fn value_to_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<CmcCoin> for Listing {
    fn from(coin: CmcCoin) -> Self {
        let quote = coin
            .quote
            .into_iter()
            .map(|(cur, q)| {
                (
                    cur.to_uppercase(),
                    Quote {
                        price: q.price,
                        volume_24h: q.volume_24h,
                        percent_change_24h: q.percent_change_24h,
                        percent_change_7d: q.percent_change_7d,
                        market_cap: q.market_cap,
                        fully_diluted_market_cap: q.fully_diluted_market_cap,
                        last_updated: q.last_updated,
                    },
                )
            })
            .collect();
        Listing {
            id: value_to_id(&coin.id),
            slug: coin.slug.unwrap_or_else(|| coin.symbol.to_lowercase()),
            name: coin.name,
            symbol: coin.symbol,
            rank: coin.cmc_rank,
            circulating_supply: coin.circulating_supply,
            total_supply: coin.total_supply,
            max_supply: coin.max_supply,
            last_updated: coin.last_updated,
            image: None,
            quote,
        }
    }
}

/// Parse `/cryptocurrency/listings/latest`. Body-level errors surface as `Err(message)` in the
/// inner result so the adapter can classify them.
pub fn from_cmc_listings(body: &str) -> Result<std::result::Result<Vec<Listing>, String>> {
    let raw: CmcListingsResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("CMC JSON: {}", e)))?;
    if let Some(msg) = cmc_error_message(raw.status.as_ref()) {
        return Ok(Err(msg));
    }
    Ok(Ok(raw.data.into_iter().map(Listing::from).collect()))
}

/// Parse `/cryptocurrency/quotes/latest`.
pub fn from_cmc_quotes(
    body: &str,
    symbols: &[String],
) -> Result<std::result::Result<Vec<Listing>, String>> {
    let raw: CmcQuotesResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("CMC JSON: {}", e)))?;
    if let Some(msg) = cmc_error_message(raw.status.as_ref()) {
        return Ok(Err(msg));
    }

    let mut results = Vec::new();
    for sym in symbols.iter().map(|s| s.to_uppercase()) {
        let Some(val) = raw.data.get(sym.as_str()) else {
            continue;
        };
        // CMC may return a single coin object or an array for duplicate symbols.
        let coin: CmcCoin = if val.is_array() {
            let coins: Vec<CmcCoin> = serde_json::from_value(val.clone())
                .map_err(|e| Error::Parse(format!("CMC coin array: {}", e)))?;
            match coins.into_iter().next() {
                Some(c) => c,
                None => continue,
            }
        } else {
            serde_json::from_value(val.clone())
                .map_err(|e| Error::Parse(format!("CMC coin: {}", e)))?
        };
        results.push(Listing::from(coin));
    }
    Ok(Ok(results))
}

// ---------------------------------------------------------------------------
// CryptoCompare
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct CcRawQuote {
    price: Option<f64>,
    #[serde(rename = "VOLUME24HOURTO")]
    volume_24h: Option<f64>,
    #[serde(rename = "CHANGEPCT24HOUR")]
    change_pct_24h: Option<f64>,
    mktcap: Option<f64>,
    supply: Option<f64>,
    #[serde(rename = "CIRCULATINGSUPPLY")]
    circulating_supply: Option<f64>,
    #[serde(rename = "CIRCULATINGSUPPLYMKTCAP")]
    circulating_mktcap: Option<f64>,
    lastupdate: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CcCoinInfo {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "FullName")]
    full_name: Option<String>,
    #[serde(rename = "ImageUrl")]
    image_url: Option<String>,
    #[serde(rename = "MaxSupply")]
    max_supply: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CcTopEntry {
    #[serde(rename = "CoinInfo")]
    coin_info: CcCoinInfo,
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, CcRawQuote>,
}

#[derive(Debug, Deserialize)]
struct CcTopResponse {
    #[serde(rename = "Data", default)]
    data: Vec<CcTopEntry>,
}

#[derive(Debug, Deserialize)]
struct CcMultiResponse {
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, HashMap<String, CcRawQuote>>,
}

/// Body-level CryptoCompare error (`{"Response":"Error","Message":...}`), if any.
pub fn cryptocompare_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if value.get("Response").and_then(|r| r.as_str()) == Some("Error") {
        Some(
            value
                .get("Message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown CryptoCompare error")
                .to_string(),
        )
    } else {
        None
    }
}

fn epoch_to_rfc3339(ts: Option<i64>) -> Option<String> {
    ts.and_then(|t| chrono::DateTime::from_timestamp(t, 0))
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

fn cc_quote(raw: &CcRawQuote) -> Quote {
    Quote {
        price: raw.price,
        volume_24h: raw.volume_24h,
        percent_change_24h: raw.change_pct_24h,
        percent_change_7d: None,
        market_cap: raw.circulating_mktcap.or(raw.mktcap),
        fully_diluted_market_cap: raw.mktcap,
        last_updated: epoch_to_rfc3339(raw.lastupdate),
    }
}

fn cc_quote_map(raw: &HashMap<String, CcRawQuote>, currency: &str) -> BTreeMap<String, Quote> {
    let mut quote: BTreeMap<String, Quote> = raw
        .iter()
        .map(|(cur, q)| (cur.to_uppercase(), cc_quote(q)))
        .collect();
    if quote.is_empty() {
        quote.insert(currency.to_uppercase(), Quote::default());
    }
    quote
}

/// Parse `/data/top/mktcapfull`.
pub fn from_cryptocompare_top(body: &str, currency: &str, offset: u32) -> Result<Vec<Listing>> {
    let raw: CcTopResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("CryptoCompare JSON: {}", e)))?;

    Ok(raw
        .data
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let first = entry.raw.values().next();
            let symbol = entry.coin_info.name.to_uppercase();
            Listing {
                id: entry
                    .coin_info
                    .id
                    .clone()
                    .unwrap_or_else(|| symbol.to_lowercase()),
                slug: symbol.to_lowercase(),
                name: entry.coin_info.full_name.clone().unwrap_or_else(|| symbol.clone()),
                rank: Some(position_rank(offset, i)),
                circulating_supply: first.and_then(|q| q.circulating_supply),
                total_supply: first.and_then(|q| q.supply),
                max_supply: entry.coin_info.max_supply.filter(|m| *m > 0.0),
                last_updated: epoch_to_rfc3339(first.and_then(|q| q.lastupdate)),
                image: entry
                    .coin_info
                    .image_url
                    .as_deref()
                    .map(|path| format!("{}{}", CRYPTOCOMPARE_MEDIA_URL, path)),
                quote: cc_quote_map(&entry.raw, currency),
                symbol,
            }
        })
        .collect())
}

/// Parse `/data/pricemultifull`.
pub fn from_cryptocompare_multi(body: &str, symbols: &[String], currency: &str) -> Result<Vec<Listing>> {
    let raw: CcMultiResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("CryptoCompare JSON: {}", e)))?;

    Ok(symbols
        .iter()
        .map(|s| s.to_uppercase())
        .filter_map(|sym| {
            let quotes = raw.raw.get(&sym)?;
            let first = quotes.values().next();
            Some(Listing {
                id: sym.to_lowercase(),
                slug: sym.to_lowercase(),
                name: sym.clone(),
                rank: None,
                circulating_supply: first.and_then(|q| q.circulating_supply),
                total_supply: first.and_then(|q| q.supply),
                max_supply: None,
                last_updated: epoch_to_rfc3339(first.and_then(|q| q.lastupdate)),
                image: None,
                quote: cc_quote_map(quotes, currency),
                symbol: sym,
            })
        })
        .collect())
}
