//! Runtime provider configuration posted by the terminal's settings panel.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::{NewsUpdate, PriceUpdate};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/price-key", post(update_price_key))
        .route("/news-key", post(update_news_key))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceKeyBody {
    pub api_key: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsKeyBody {
    pub api_key: Option<String>,
    pub provider: Option<String>,
    pub custom_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: &'static str,
}

async fn update_price_key(
    State(state): State<AppState>,
    body: Result<Json<PriceKeyBody>, JsonRejection>,
) -> ApiResult<Json<UpdateResponse>> {
    let Json(body) = body.map_err(ApiError::rejected)?;
    state.proxy.update_price_config(PriceUpdate {
        provider: body.provider,
        api_key: body.api_key,
    })?;
    Ok(Json(UpdateResponse {
        success: true,
        message: "Price provider settings updated",
    }))
}

async fn update_news_key(
    State(state): State<AppState>,
    body: Result<Json<NewsKeyBody>, JsonRejection>,
) -> ApiResult<Json<UpdateResponse>> {
    let Json(body) = body.map_err(ApiError::rejected)?;
    state.proxy.update_news_config(NewsUpdate {
        provider: body.provider,
        api_key: body.api_key,
        custom_url: body.custom_url,
    })?;
    Ok(Json(UpdateResponse {
        success: true,
        message: "News settings updated",
    }))
}
