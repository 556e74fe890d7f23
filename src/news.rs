//! News chain filter and the static article set served when the default wire is down.

use std::fmt;

use crate::model::{Article, SourceInfo};
use crate::provider::NewsProviderId;

/// Chain value meaning "the general wire".
pub const ALL_CHAINS: &str = "all";

/// Where a batch of articles came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsSource {
    CryptoCompare,
    NewsApi,
    Custom,
    /// Hardcoded headlines.
    Static,
}

impl NewsSource {
    pub fn name(self) -> &'static str {
        match self {
            Self::CryptoCompare => NewsProviderId::CryptoCompare.name(),
            Self::NewsApi => NewsProviderId::NewsApi.name(),
            Self::Custom => NewsProviderId::Custom.name(),
            Self::Static => "static news",
        }
    }
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CryptoCompare => "cryptocompare",
            Self::NewsApi => "newsapi",
            Self::Custom => "custom",
            Self::Static => "static",
        })
    }
}

/// Post-normalization article filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainFilter {
    /// General wire: drop articles mentioning any of the excluded terms.
    All { excluded: Vec<String> },
    /// Keep only articles mentioning the chain.
    Only(String),
}

impl ChainFilter {
    /// `None`, blank and `all` select the general wire.
    pub fn new(chain: Option<&str>, excluded: &[String]) -> Self {
        match chain.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) if !c.eq_ignore_ascii_case(ALL_CHAINS) => Self::Only(c.to_lowercase()),
            _ => Self::All {
                excluded: excluded.to_vec(),
            },
        }
    }

    /// The chain part of the cache key.
    pub fn key(&self) -> &str {
        match self {
            Self::All { .. } => ALL_CHAINS,
            Self::Only(chain) => chain,
        }
    }

    pub fn apply(&self, articles: &[Article]) -> Vec<Article> {
        articles
            .iter()
            .filter(|a| self.keeps(a))
            .cloned()
            .collect()
    }

    fn keeps(&self, article: &Article) -> bool {
        match self {
            Self::All { excluded } => !excluded.iter().any(|term| article.mentions(term)),
            Self::Only(chain) => article.mentions(chain),
        }
    }
}

/// Hardcoded headlines, timestamped relative to `now` (epoch seconds).
pub fn static_articles(now: i64) -> Vec<Article> {
    const ITEMS: [(&str, i64, &str, &str, &str, &str, &str); 5] = [
        (
            "1",
            300,
            "Bitcoin Maintains Support Above $97K Amid Market Consolidation",
            "Leading cryptocurrency continues to show resilience as institutional investors maintain positions. Market analysts suggest the current support level could determine near-term direction for BTC.",
            "https://www.coindesk.com/markets/",
            "CoinDesk",
            "Bitcoin|Markets",
        ),
        (
            "2",
            900,
            "Ethereum Gas Fees Drop to 3-Month Low",
            "Network congestion eases as Layer 2 adoption accelerates across DeFi protocols. Average transaction fees have fallen significantly.",
            "https://decrypt.co/",
            "Decrypt",
            "Ethereum|DeFi",
        ),
        (
            "3",
            1800,
            "Major Exchange Reports Record Trading Volume",
            "24-hour trading volume surpasses previous all-time high amid increased market activity across spot and derivatives markets.",
            "https://cointelegraph.com/",
            "CoinTelegraph",
            "Exchanges|Markets",
        ),
        (
            "4",
            3600,
            "DeFi TVL Reaches New All-Time High",
            "Total value locked across decentralized finance protocols shows strong growth. New DeFi projects continue to attract significant capital.",
            "https://defillama.com/",
            "DeFi Llama",
            "DeFi",
        ),
        (
            "5",
            5400,
            "Solana Network Activity Hits Record Levels",
            "Latest protocol metrics show significant growth in daily active addresses and transaction throughput.",
            "https://solana.com/",
            "Solana Foundation",
            "Solana",
        ),
    ];

    ITEMS
        .iter()
        .map(|(id, age, title, body, url, source, categories)| Article {
            id: id.to_string(),
            published_on: now - age,
            title: title.to_string(),
            body: body.to_string(),
            url: url.to_string(),
            source_info: SourceInfo {
                name: source.to_string(),
            },
            categories: categories.to_string(),
            imageurl: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded() -> Vec<String> {
        vec!["solana".to_string()]
    }

    #[test]
    fn missing_blank_and_all_select_the_general_wire() {
        for chain in [None, Some(""), Some("  "), Some("ALL")] {
            let filter = ChainFilter::new(chain, &excluded());
            assert_eq!(filter.key(), "all");
        }
        assert_eq!(ChainFilter::new(Some("Solana"), &excluded()).key(), "solana");
    }

    #[test]
    fn all_excludes_configured_terms() {
        let articles = static_articles(10_000);
        let kept = ChainFilter::new(None, &excluded()).apply(&articles);
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|a| !a.mentions("solana")));

        let unfiltered = ChainFilter::new(None, &[]).apply(&articles);
        assert_eq!(unfiltered.len(), 5);
    }

    #[test]
    fn chain_keeps_only_matching_articles() {
        let articles = static_articles(10_000);
        let kept = ChainFilter::new(Some("ethereum"), &excluded()).apply(&articles);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "2");

        assert!(
            ChainFilter::new(Some("cardano"), &excluded())
                .apply(&articles)
                .is_empty()
        );
    }

    #[test]
    fn static_set_is_newest_first() {
        let articles = static_articles(10_000);
        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);
        assert_eq!(articles[0].published_on, 9_700);
        assert_eq!(articles[4].published_on, 4_600);
        assert!(articles.windows(2).all(|w| w[0].published_on > w[1].published_on));
    }
}
