//! Pure mappings from provider-native JSON into the canonical schema.

pub mod listings;
pub mod news;

use crate::model::Listing;

/// Currency actually present in the listings: the requested one when any
/// listing carries it, otherwise the first currency the upstream returned.
pub fn resolved_currency(listings: &[Listing], requested: &str) -> String {
    let requested = requested.to_uppercase();
    if listings.is_empty() || listings.iter().any(|l| l.quote.contains_key(&requested)) {
        return requested;
    }
    listings
        .iter()
        .find_map(|l| l.quote.keys().next().cloned())
        .unwrap_or(requested)
}
