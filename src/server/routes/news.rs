use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::model::NewsResponse;
use crate::proxy::NewsRequest;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/news", get(news))
        .route("/news/solana", get(solana_news))
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    pub refresh: Option<String>,
    pub chain: Option<String>,
    pub provider: Option<String>,
}

impl NewsParams {
    /// Any value other than `false` or `0` forces a refetch.
    fn refresh(&self) -> bool {
        match self.refresh.as_deref().map(str::trim) {
            None | Some("") | Some("false") | Some("0") => false,
            Some(_) => true,
        }
    }
}

async fn news(
    State(state): State<AppState>,
    params: Result<Query<NewsParams>, QueryRejection>,
) -> ApiResult<Json<NewsResponse>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    let refresh = params.refresh();
    let response = state
        .proxy
        .get_news(NewsRequest {
            provider: params.provider,
            chain: params.chain,
            refresh,
        })
        .await?;
    Ok(Json(response))
}

async fn solana_news(
    State(state): State<AppState>,
    params: Result<Query<NewsParams>, QueryRejection>,
) -> ApiResult<Json<NewsResponse>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    let response = state
        .proxy
        .get_news(NewsRequest {
            provider: params.provider.clone(),
            chain: Some("solana".to_string()),
            refresh: params.refresh(),
        })
        .await?;
    Ok(Json(response))
}
