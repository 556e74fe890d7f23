use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use terminal_proxy::config::{self, AppConfig};
use terminal_proxy::error::{Error, Result};
use terminal_proxy::proxy::MarketProxy;
use terminal_proxy::{VERSION, output, server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "terminal-proxy",
    version = VERSION,
    about = "Market data and news proxy for the crypto terminal"
)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short, env = "PORT")]
    port: Option<u16>,

    /// Explicit config file path (overrides XDG lookup)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Active price provider (coingecko, cryptocompare, cmc)
    #[arg(long, env = "PRICE_PROVIDER")]
    price_provider: Option<String>,

    /// API key for the active price provider
    #[arg(long, env = "PRICE_API_KEY", hide_env_values = true)]
    price_api_key: Option<String>,

    /// CoinMarketCap API key, also used for quotes
    #[arg(long, env = "CMC_API_KEY", hide_env_values = true)]
    cmc_api_key: Option<String>,

    /// Active news provider (cryptocompare, newsapi, custom)
    #[arg(long, env = "NEWS_PROVIDER")]
    news_provider: Option<String>,

    /// API key for the active news provider
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    news_api_key: Option<String>,

    /// News endpoint used by the custom provider
    #[arg(long, env = "CUSTOM_NEWS_URL")]
    custom_news_url: Option<String>,

    /// List available providers
    #[arg(long)]
    list_providers: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Flags and environment win over the config file.
fn apply_overrides(cfg: &mut AppConfig, cli: &Cli) -> Result<()> {
    if let Some(host) = config::non_empty(cli.host.clone()) {
        cfg.server.host = host;
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }
    if let Some(provider) = config::non_empty(cli.price_provider.clone()) {
        cfg.price.provider = provider
            .parse()
            .map_err(|e: Error| Error::Config(e.to_string()))?;
    }
    if let Some(key) = config::non_empty(cli.price_api_key.clone()) {
        cfg.price.api_key = Some(key);
    }
    if let Some(key) = config::non_empty(cli.cmc_api_key.clone()) {
        cfg.price.cmc_api_key = Some(key);
    }
    if let Some(provider) = config::non_empty(cli.news_provider.clone()) {
        cfg.news.provider = provider
            .parse()
            .map_err(|e: Error| Error::Config(e.to_string()))?;
    }
    if let Some(key) = config::non_empty(cli.news_api_key.clone()) {
        cfg.news.api_key = Some(key);
    }
    if let Some(url) = config::non_empty(cli.custom_news_url.clone()) {
        cfg.news.custom_url = Some(url);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env before CLI parsing so env-backed args (e.g. CMC_API_KEY) pick it up.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!(error = %e, "fatal error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.list_providers {
        output::print_providers_table();
        return Ok(());
    }

    let mut app_config = match cli.config.as_deref() {
        Some(path) => config::load_from_path(path)?,
        None => config::load()?,
    };
    apply_overrides(&mut app_config, &cli)?;

    let proxy = Arc::new(MarketProxy::from_config(&app_config)?);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    output::print_banner(&addr, VERSION, &proxy.store().price(), &proxy.store().news());

    info!(
        price_provider = %app_config.price.provider,
        news_provider = %app_config.news.provider,
        "starting proxy"
    );
    server::serve(&app_config.server, proxy).await
}
