use axum::Router;

use crate::server::state::AppState;

pub mod market;
pub mod news;
pub mod settings;
pub mod system;

/// Every endpoint under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(market::routes())
        .merge(news::routes())
        .merge(settings::routes())
        .merge(system::routes())
}
