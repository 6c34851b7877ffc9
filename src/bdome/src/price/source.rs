//! Remote price sites.
//!
//! Each site is fetched with a plain GET and the price is read out of the
//! first element carrying a site-specific CSS class.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::agents::random_user_agent;
use super::PriceError;
use crate::constants::{ITEMDB_PRICE_CACHE_FILE, JELLYNEO_PRICE_CACHE_FILE};

/// Something that can price a single item
pub trait PriceSource {
    /// Short name for log messages
    fn name(&self) -> &str;

    /// Current unit price. A page without a price is [`PriceError::NoPrice`],
    /// which is retried like any other failure.
    fn price(&self, item: &str) -> Result<f64, PriceError>;

    /// Where prices from this source are cached
    fn file_path(&self) -> &Path;
}

impl<T: PriceSource + ?Sized> PriceSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn price(&self, item: &str) -> Result<f64, PriceError> {
        (**self).price(item)
    }

    fn file_path(&self) -> &Path {
        (**self).file_path()
    }
}

/// Known price sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSourceKind {
    #[default]
    JellyNeo,
    ItemDb,
}

impl PriceSourceKind {
    /// Cache file name for prices from this site
    pub fn cache_file_name(&self) -> &'static str {
        match self {
            Self::JellyNeo => JELLYNEO_PRICE_CACHE_FILE,
            Self::ItemDb => ITEMDB_PRICE_CACHE_FILE,
        }
    }

    /// Class of the element holding the price
    pub fn price_class(&self) -> &'static str {
        match self {
            Self::JellyNeo => "price-history-link",
            Self::ItemDb => "chakra-stat__number",
        }
    }

    /// JellyNeo is searched by exact name, itemdb is addressed by slug
    pub fn url(&self, item: &str) -> String {
        match self {
            Self::JellyNeo => format!(
                "https://items.jellyneo.net/search/?name={}&name_type=3",
                query_escape(item)
            ),
            Self::ItemDb => format!("https://itemdb.com.br/item/{}", normalise_item_name(item)),
        }
    }
}

impl std::fmt::Display for PriceSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JellyNeo => write!(f, "jellyneo"),
            Self::ItemDb => write!(f, "itemdb"),
        }
    }
}

impl std::str::FromStr for PriceSourceKind {
    type Err = PriceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jellyneo" | "jn" => Ok(Self::JellyNeo),
            "itemdb" => Ok(Self::ItemDb),
            _ => Err(PriceError::UnknownSource(s.to_string())),
        }
    }
}

/// `"Bri Codestone!"` -> `"bri-codestone"`
pub fn normalise_item_name(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .replace([':', '!'], "")
}

/// Form-style query escaping: `"Bri Codestone"` -> `"Bri+Codestone"`
fn query_escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Price inside the first element with `class`.
///
/// No matching element gives [`PriceError::NoPrice`]. Matching elements
/// whose text is not a number give a parse error.
pub fn extract_price(html: &str, class: &str) -> Result<f64, PriceError> {
    let pattern = format!(
        r#"class\s*=\s*"[^"]*\b{}\b[^"]*"[^>]*>\s*([^<]*)"#,
        regex::escape(class)
    );
    let selector = Regex::new(&pattern).map_err(|e| PriceError::Selector(e.to_string()))?;

    let mut last_text = None;
    for caps in selector.captures_iter(html) {
        let text = caps.get(1).map_or("", |m| m.as_str());
        if let Some(price) = parse_price_text(text) {
            return Ok(price);
        }
        last_text = Some(text.trim().to_string());
    }

    match last_text {
        Some(text) => Err(PriceError::Parse(text)),
        None => Err(PriceError::NoPrice(class.to_string())),
    }
}

/// `"1,234,567 NP"` -> `1234567.0`
fn parse_price_text(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches("NP")
        .trim()
        .replace(',', "")
        .parse()
        .ok()
}

/// A price site scraped over HTTP
pub struct HtmlPriceSource {
    kind: PriceSourceKind,
    agent: ureq::Agent,
    file_path: PathBuf,
}

impl HtmlPriceSource {
    /// Source for `kind` caching its prices under `data_dir`
    pub fn new<P: AsRef<Path>>(kind: PriceSourceKind, data_dir: P) -> Self {
        Self {
            kind,
            agent: ureq::Agent::new(),
            file_path: data_dir.as_ref().join(kind.cache_file_name()),
        }
    }
}

impl PriceSource for HtmlPriceSource {
    fn name(&self) -> &str {
        match self.kind {
            PriceSourceKind::JellyNeo => "JellyNeo",
            PriceSourceKind::ItemDb => "itemdb",
        }
    }

    fn price(&self, item: &str) -> Result<f64, PriceError> {
        let url = self.kind.url(item);
        let body = match self
            .agent
            .get(&url)
            .set("User-Agent", random_user_agent())
            .call()
        {
            Ok(resp) => resp.into_string()?,
            Err(ureq::Error::Status(code, _)) => {
                return Err(PriceError::Status { code, url });
            }
            Err(e) => return Err(PriceError::Http(e.to_string())),
        };

        extract_price(&body, self.kind.price_class())
    }

    fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_item_name() {
        assert_eq!(normalise_item_name("Tai-Kai Codestone"), "tai-kai-codestone");
        assert_eq!(normalise_item_name("Lost Desert Scroll: Part 1!"), "lost-desert-scroll-part-1");
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            PriceSourceKind::ItemDb.url("Bri Codestone"),
            "https://itemdb.com.br/item/bri-codestone"
        );
        assert_eq!(
            PriceSourceKind::JellyNeo.url("Bri Codestone"),
            "https://items.jellyneo.net/search/?name=Bri+Codestone&name_type=3"
        );
        assert_eq!(
            PriceSourceKind::JellyNeo.url("Lost Desert Scroll: Part 1!"),
            "https://items.jellyneo.net/search/?name=Lost+Desert+Scroll%3A+Part+1%21&name_type=3"
        );
        assert_eq!(
            PriceSourceKind::JellyNeo.url("Tai-Kai Codestone"),
            "https://items.jellyneo.net/search/?name=Tai-Kai+Codestone&name_type=3"
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("ItemDb".parse::<PriceSourceKind>().unwrap(), PriceSourceKind::ItemDb);
        assert_eq!("jellyneo".parse::<PriceSourceKind>().unwrap(), PriceSourceKind::JellyNeo);
        assert!("neomarket".parse::<PriceSourceKind>().is_err());
        assert_eq!(PriceSourceKind::ItemDb.to_string(), "itemdb");
    }

    #[test]
    fn test_extract_price_jellyneo() {
        let html = r#"<ul><li><a href="/price-history/123" class="price-history-link" title="History">12,345 NP</a></li></ul>"#;
        assert_eq!(extract_price(html, "price-history-link").unwrap(), 12345.0);
    }

    #[test]
    fn test_extract_price_itemdb() {
        let html = r#"<div><dd class="chakra-stat__number css-1axeus7">
            1,500,000 NP</dd></div>"#;
        assert_eq!(extract_price(html, "chakra-stat__number").unwrap(), 1_500_000.0);
    }

    #[test]
    fn test_extract_first_parsable() {
        let html = r#"<span class="price-history-link">Unknown</span><span class="price-history-link">42 NP</span>"#;
        assert_eq!(extract_price(html, "price-history-link").unwrap(), 42.0);
    }

    #[test]
    fn test_extract_no_match() {
        let html = r#"<div class="price-history-linked">5 NP</div><p>nothing here</p>"#;
        assert!(matches!(
            extract_price(html, "price-history-link"),
            Err(PriceError::NoPrice(class)) if class == "price-history-link"
        ));
        assert!(matches!(
            extract_price("<html></html>", "chakra-stat__number"),
            Err(PriceError::NoPrice(_))
        ));
    }

    #[test]
    fn test_extract_unparsable() {
        let html = r#"<a class="price-history-link">Inflated!</a>"#;
        assert!(matches!(
            extract_price(html, "price-history-link"),
            Err(PriceError::Parse(_))
        ));
    }

    #[test]
    fn test_source_file_path() {
        let source = HtmlPriceSource::new(PriceSourceKind::ItemDb, "/tmp/data");
        assert_eq!(
            source.file_path(),
            Path::new("/tmp/data/neopets_itemdb_item_price_cache.txt")
        );
        assert_eq!(source.name(), "itemdb");
    }
}
