//! axum HTTP surface: every endpoint lives under `/api`.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::proxy::MarketProxy;
use state::AppState;

/// Router with CORS open to the browser terminal and a request span per call.
pub fn build_router(proxy: Arc<MarketProxy>) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .with_state(AppState::new(proxy))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, proxy: Arc<MarketProxy>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => {
            Error::Config(format!("cannot bind {}: address already in use (set --port or PORT)", addr))
        }
        _ => Error::Io(e),
    })?;

    info!(addr = %addr, "proxy listening");
    axum::serve(listener, build_router(proxy))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
