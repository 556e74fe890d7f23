use std::io::Write;

use terminal_proxy::config;
use terminal_proxy::error::Error;
use terminal_proxy::provider::{NewsProviderId, PriceProviderId};
use terminal_proxy::proxy::MarketProxy;
use terminal_proxy::store::ConfigStore;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_seeds_the_runtime_store() {
    let file = write_config(
        r#"
        [price]
        provider = "cryptocompare"
        api_key = "cc-key"
        cmc_api_key = "cmc-key"

        [news]
        provider = "custom"
        custom_url = "feeds.example.com/latest"

        [cache]
        news_ttl_secs = 30
        "#,
    );

    let cfg = config::load_from_path(file.path()).unwrap();
    assert_eq!(cfg.cache.news_ttl_secs, 30);

    let store = ConfigStore::from_config(&cfg).unwrap();
    let price = store.price();
    assert_eq!(price.active, PriceProviderId::CryptoCompare);
    assert_eq!(price.credential_for(PriceProviderId::CryptoCompare), Some("cc-key"));
    assert_eq!(price.credential_for(PriceProviderId::CoinMarketCap), Some("cmc-key"));

    let news = store.news();
    assert_eq!(news.active, NewsProviderId::Custom);
    assert_eq!(
        news.custom_url.map(|u| u.to_string()).as_deref(),
        Some("https://feeds.example.com/latest")
    );
}

#[test]
fn custom_provider_without_url_starts_on_the_default_wire() {
    let file = write_config("[news]\nprovider = \"custom\"\n");
    let cfg = config::load_from_path(file.path()).unwrap();

    let store = ConfigStore::from_config(&cfg).unwrap();
    assert_eq!(store.news().active, NewsProviderId::CryptoCompare);
}

#[test]
fn invalid_startup_custom_url_refuses_to_start() {
    let file = write_config("[news]\nprovider = \"custom\"\ncustom_url = \"not a url\"\n");
    let cfg = config::load_from_path(file.path()).unwrap();

    assert!(matches!(
        MarketProxy::from_config(&cfg),
        Err(Error::InvalidCustomUrl { .. })
    ));
}

#[test]
fn malformed_file_reports_its_path() {
    let file = write_config("[server\nport = 1");
    let err = config::load_from_path(file.path()).unwrap_err();

    assert!(matches!(err, Error::Config(ref msg) if msg.contains(&file.path().display().to_string())));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, Error::Config(ref msg) if msg.contains("cannot read")));
}
