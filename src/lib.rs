pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod images;
pub mod model;
pub mod news;
pub mod normalize;
pub mod output;
pub mod provider;
pub mod proxy;
pub mod server;
pub mod store;

/// Build version, with the git revision when available.
pub const VERSION: &str = env!("TERMINAL_PROXY_VERSION");
