//! Terminal output for the binary: provider table and startup banner.

use colored::{ColoredString, Colorize};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::provider::{REGISTRY, ProviderInfo};
use crate::store::{NewsSettings, PriceSettings};

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "API Key")]
    key: &'static str,
    #[tabled(rename = "Base URL")]
    base_url: &'static str,
}

impl From<&ProviderInfo> for ProviderRow {
    fn from(info: &ProviderInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            kind: info.kind.as_str(),
            key: if info.requires_credential { "required" } else { "optional" },
            base_url: info.base_url,
        }
    }
}

pub fn providers_table() -> String {
    let rows: Vec<ProviderRow> = REGISTRY.iter().map(ProviderRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn print_providers_table() {
    println!("{}", providers_table());
}

fn key_state(configured: bool) -> ColoredString {
    if configured {
        "key configured".green()
    } else {
        "no key".yellow()
    }
}

/// Startup summary. Credentials are reported as present or absent, never shown.
pub fn print_banner(addr: &str, version: &str, price: &PriceSettings, news: &NewsSettings) {
    println!();
    println!("{} {}", "terminal-proxy".bold(), version.dimmed());
    println!("  {:<11} {}", "API:", format!("http://{}/api", addr).cyan());
    println!(
        "  {:<11} {} ({})",
        "Prices:",
        price.active.name().green(),
        key_state(price.credential_for(price.active).is_some())
    );
    println!(
        "  {:<11} {}",
        "CMC quotes:",
        key_state(price.cmc_credential.is_some())
    );
    println!(
        "  {:<11} {} ({})",
        "News:",
        news.active.name().green(),
        key_state(news.credential.is_some())
    );
    if let Some(url) = &news.custom_url {
        println!("  {:<11} {}", "News URL:", url.as_str().cyan());
    }
    println!();
}
