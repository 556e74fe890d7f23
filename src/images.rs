//! Icon lookup built from CoinGecko market pages and merged into listings.

use std::collections::HashMap;

use crate::model::Listing;
use crate::normalize::listings::CoinGeckoMarket;

/// Market pages fetched to build the index (250 rows each).
pub const IMAGE_PAGES: u32 = 3;

/// Index every market by upper symbol, lower symbol, id and lower name.
/// Earlier (higher market cap) rows win on collisions.
pub fn build_index<'a>(markets: impl IntoIterator<Item = &'a CoinGeckoMarket>) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for market in markets {
        let Some(image) = market.image.as_deref().filter(|i| !i.is_empty()) else {
            continue;
        };
        for key in [
            market.symbol.to_uppercase(),
            market.symbol.to_lowercase(),
            market.id.clone(),
            market.name.to_lowercase(),
        ] {
            index.entry(key).or_insert_with(|| image.to_string());
        }
    }
    index
}

fn lookup<'a>(index: &'a HashMap<String, String>, listing: &Listing) -> Option<&'a String> {
    index
        .get(&listing.symbol.to_uppercase())
        .or_else(|| index.get(&listing.symbol.to_lowercase()))
        .or_else(|| index.get(&listing.id))
        .or_else(|| index.get(&listing.name.to_lowercase()))
}

/// Copy of `listings` with `image` set from the index; misses become `None`.
/// Listings that already carry an image keep it.
pub fn merge(listings: &[Listing], index: &HashMap<String, String>) -> Vec<Listing> {
    listings
        .iter()
        .map(|listing| {
            let image = listing
                .image
                .clone()
                .or_else(|| lookup(index, listing).cloned());
            Listing {
                image,
                ..listing.clone()
            }
        })
        .collect()
}

pub fn all_have_images(listings: &[Listing]) -> bool {
    listings.iter().all(|l| l.image.is_some())
}
