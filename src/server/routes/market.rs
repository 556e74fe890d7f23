//! Listings, quotes, single-coin and token-list endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::model::{ListingsResponse, QuotesResponse, TokensResponse};
use crate::proxy::{ListingsRequest, QuotesRequest};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cmc/listings", get(listings))
        .route("/cmc/quotes", get(quotes))
        .route("/coin/detail", get(coin_detail))
        .route("/coin/market", get(coin_market))
        .route("/solana/tokens", get(solana_tokens))
}

#[derive(Debug, Deserialize)]
pub struct ListingsParams {
    pub start: Option<u32>,
    pub limit: Option<u32>,
    pub convert: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuotesParams {
    pub symbol: Option<String>,
    pub convert: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinParams {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub convert: Option<String>,
}

async fn listings(
    State(state): State<AppState>,
    params: Result<Query<ListingsParams>, QueryRejection>,
) -> ApiResult<Json<ListingsResponse>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    let response = state
        .proxy
        .get_listings(ListingsRequest {
            provider: params.provider,
            start: params.start,
            limit: params.limit,
            convert: params.convert,
        })
        .await?;
    Ok(Json(response))
}

async fn quotes(
    State(state): State<AppState>,
    params: Result<Query<QuotesParams>, QueryRejection>,
) -> ApiResult<Json<QuotesResponse>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    let response = state
        .proxy
        .get_quotes(QuotesRequest {
            provider: params.provider,
            symbols: params.symbol.unwrap_or_default(),
            convert: params.convert,
        })
        .await?;
    Ok(Json(response))
}

async fn coin_detail(
    State(state): State<AppState>,
    params: Result<Query<CoinParams>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    let detail = state
        .proxy
        .coin_detail(params.id.as_deref(), params.symbol.as_deref())
        .await?;
    Ok(Json(detail))
}

async fn coin_market(
    State(state): State<AppState>,
    params: Result<Query<CoinParams>, QueryRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    let market = state
        .proxy
        .coin_market(params.id.as_deref(), params.convert.as_deref())
        .await?;
    Ok(Json(market))
}

async fn solana_tokens(State(state): State<AppState>) -> ApiResult<Json<TokensResponse>> {
    Ok(Json(state.proxy.solana_tokens().await?))
}
