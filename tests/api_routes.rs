use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use terminal_proxy::cache::MemoryCache;
use terminal_proxy::config::{AppConfig, UpstreamConfig};
use terminal_proxy::provider::{NewsProviderId, PriceProviderId, Providers};
use terminal_proxy::proxy::MarketProxy;
use terminal_proxy::server::build_router;
use terminal_proxy::store::{ConfigStore, NewsSettings, PriceSettings};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn proxy_at(server: &MockServer, price: PriceSettings, news: NewsSettings) -> Arc<MarketProxy> {
    let config = AppConfig {
        upstreams: UpstreamConfig::all_at(&server.uri()),
        ..AppConfig::default()
    };
    Arc::new(MarketProxy::new(
        Providers::from_config(&config).unwrap(),
        Arc::new(ConfigStore::new(price, news)),
        Arc::new(MemoryCache::new()),
        &config,
    ))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_active_price_provider() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["api"], "CoinGecko (with CryptoCompare fallback)");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn missing_key_is_a_400_with_settings_hint() {
    let server = MockServer::start().await;
    let price = PriceSettings {
        active: PriceProviderId::CoinMarketCap,
        ..PriceSettings::default()
    };
    let router = build_router(proxy_at(&server, price, NewsSettings::default()));

    let (status, body) = send(router, get("/api/cmc/listings?limit=10")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "API key required");
    assert_eq!(
        body["message"],
        "CoinMarketCap requires an API key. Please add your key in Settings > Data > API Key"
    );
}

#[tokio::test]
async fn listings_use_the_frontend_layout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coingecko/api/v3/coins/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
            "image": "https://img/btc.png", "current_price": 50000.0, "market_cap_rank": 1
        }])))
        .mount(&server)
        .await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/cmc/listings?start=1&limit=1&convert=USD")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["error_code"], 0);
    assert_eq!(body["status"]["notice"], "Using CoinGecko data (default)");
    let coin = &body["data"][0];
    assert_eq!(coin["symbol"], "BTC");
    assert_eq!(coin["cmc_rank"], 1);
    assert_eq!(coin["quote"]["USD"]["price"], 50000.0);
    assert!(coin["max_supply"].is_null());
}

#[tokio::test]
async fn malformed_query_is_a_bad_request() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/cmc/listings?start=abc")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn quotes_require_a_symbol() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/cmc/quotes")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "symbol parameter is required");
}

#[tokio::test]
async fn unknown_provider_override_is_rejected() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, _) = send(router, get("/api/cmc/listings?provider=binance")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn news_with_no_articles_is_a_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsapi/v2/everything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok", "totalResults": 0, "articles": []
        })))
        .mount(&server)
        .await;
    let news = NewsSettings {
        active: NewsProviderId::NewsApi,
        credential: Some("news-key".into()),
        custom_url: None,
    };
    let router = build_router(proxy_at(&server, PriceSettings::default(), news));

    let (status, body) = send(router, get("/api/news")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No articles");
    assert_eq!(body["message"], "NewsAPI returned 0 articles");
}

#[tokio::test]
async fn solana_news_route_forces_the_chain_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cryptocompare/data/v2/news/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Data": [
                { "id": "1", "published_on": 1, "title": "Bitcoin rallies", "categories": "BTC" },
                { "id": "2", "published_on": 2, "title": "Jupiter launches on Solana", "categories": "SOL" }
            ]
        })))
        .mount(&server)
        .await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/news/solana?chain=ethereum")).await;

    assert_eq!(status, StatusCode::OK);
    let data = body["Data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], "2");
}

#[tokio::test]
async fn invalid_custom_url_is_rejected_and_settings_kept() {
    let server = MockServer::start().await;
    let proxy = proxy_at(&server, PriceSettings::default(), NewsSettings::default());
    let router = build_router(Arc::clone(&proxy));

    let (status, body) = send(
        router,
        post_json(
            "/api/news-key",
            serde_json::json!({ "provider": "custom", "customUrl": "not a url" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid URL");
    assert_eq!(proxy.store().news(), NewsSettings::default());
}

#[tokio::test]
async fn price_key_update_switches_provider() {
    let server = MockServer::start().await;
    let proxy = proxy_at(&server, PriceSettings::default(), NewsSettings::default());
    let router = build_router(Arc::clone(&proxy));

    let (status, body) = send(
        router,
        post_json("/api/price-key", serde_json::json!({ "provider": "cmc", "apiKey": "abc" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let price = proxy.store().price();
    assert_eq!(price.active, PriceProviderId::CoinMarketCap);
    assert_eq!(price.credential_for(PriceProviderId::CoinMarketCap), Some("abc"));
}

#[tokio::test]
async fn malformed_settings_body_is_a_bad_request() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let request = Request::builder()
        .method("POST")
        .uri("/api/price-key")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");
}

#[tokio::test]
async fn token_list_is_keyed_by_mint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jupiter/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "address": "mint-a", "name": "Alpha", "symbol": "ALP", "decimals": 6, "logoURI": "https://img/a.png" }
        ])))
        .mount(&server)
        .await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/solana/tokens")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["tokens"]["mint-a"]["logoURI"], "https://img/a.png");
}

#[tokio::test]
async fn coin_detail_needs_id_or_symbol() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/coin/detail")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "id or symbol parameter is required");
}

#[tokio::test]
async fn coin_detail_by_symbol_resolves_through_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coingecko/api/v3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "coins": [{ "id": "solana", "symbol": "SOL" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/coingecko/api/v3/coins/solana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "solana", "symbol": "sol", "links": { "homepage": ["https://solana.com"] }
        })))
        .mount(&server)
        .await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let (status, body) = send(router, get("/api/coin/detail?symbol=SOL")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "solana");
    assert_eq!(body["links"]["homepage"][0], "https://solana.com");
}

#[tokio::test]
async fn responses_allow_any_origin() {
    let server = MockServer::start().await;
    let router = build_router(proxy_at(&server, PriceSettings::default(), NewsSettings::default()));

    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
