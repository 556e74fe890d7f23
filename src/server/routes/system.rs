use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::model::HealthResponse;
use crate::server::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.proxy.health())
}
