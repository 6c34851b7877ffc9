//! Item valuation: remote price sites behind a persistent, expiring cache.

mod agents;
mod cache;
mod retry;
mod source;

pub use agents::{random_user_agent, USER_AGENTS};
pub use cache::PriceCache;
pub use retry::RetryPolicy;
pub use source::{
    extract_price, normalise_item_name, HtmlPriceSource, PriceSource, PriceSourceKind,
};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::NOTHING;

#[derive(Error, Debug)]
pub enum PriceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Price cache {path}: {source}")]
    CacheFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Price cache is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {code} from {url}")]
    Status { code: u16, url: String },

    #[error("Could not read a price from \"{0}\"")]
    Parse(String),

    #[error("No element of class \"{0}\" on the page")]
    NoPrice(String),

    #[error("Invalid price selector: {0}")]
    Selector(String),

    #[error("Unknown price source: {0} (expected jellyneo or itemdb)")]
    UnknownSource(String),
}

/// Unit prices resolved for one analysis
///
/// Missing names and `nothing` price at 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceTable(BTreeMap<String, f64>);

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, price: f64) {
        self.0.insert(name.into(), price);
    }

    pub fn get(&self, name: &str) -> f64 {
        if name == NOTHING {
            return 0.0;
        }
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, price)| (name.as_str(), *price))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, price)| (name.into(), price)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_table_defaults_to_zero() {
        let table: PriceTable = [("Bri Codestone", 5_000.0), (NOTHING, 12.0)].into_iter().collect();
        assert_eq!(table.get("Bri Codestone"), 5_000.0);
        assert_eq!(table.get("Unknown Thing"), 0.0);
        assert_eq!(table.get(NOTHING), 0.0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_error_messages_name_the_key() {
        let err = PriceError::Status {
            code: 503,
            url: "https://itemdb.com.br/item/bri-codestone".into(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 503 from https://itemdb.com.br/item/bri-codestone"
        );
    }
}
