//! Persistent item price cache.
//!
//! File layout: the first line is the expiry timestamp, every other line is
//! `name|price`. Expiry applies to the whole file. The file is rewritten in
//! full on [`PriceCache::close`].
//!
//! A loaded cache holds `<file>.lock` until it is closed or dropped, so only
//! one process at a time owns a cache file.

use chrono::{Duration, Local, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use super::source::PriceSource;
use super::{PriceError, PriceTable};
use crate::constants::{DATA_EXPIRY_TIME_LAYOUT, NOTHING, PRICE_CACHE_EXPIRY_DAYS};

/// Exclusive hold on a cache file, released on drop
#[derive(Debug)]
struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    fn path_for(cache_path: &Path) -> PathBuf {
        let mut name = cache_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn acquire(cache_path: &Path) -> Result<Self, PriceError> {
        let path = Self::path_for(cache_path);
        let io_err = |source| PriceError::CacheFile {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id()).map_err(io_err)?;
                debug!("Locked {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(PriceError::Locked(path)),
            Err(source) => Err(io_err(source)),
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Could not release {}: {}", self.path.display(), e);
        }
    }
}

/// Single-owner price cache in front of a [`PriceSource`]
pub struct PriceCache {
    source: Box<dyn PriceSource>,
    path: PathBuf,
    _lock: CacheLock,
    expiry: NaiveDateTime,
    prices: BTreeMap<String, f64>,
    banned: HashSet<String>,
    special: HashMap<String, f64>,
    retry: RetryPolicy,
}

fn fresh_expiry(now: NaiveDateTime) -> NaiveDateTime {
    now + Duration::days(PRICE_CACHE_EXPIRY_DAYS)
}

impl PriceCache {
    /// Load the cache file belonging to `source`, relative to the current time
    pub fn load(source: Box<dyn PriceSource>) -> Result<Self, PriceError> {
        Self::load_at(source, Local::now().naive_local())
    }

    /// Load as if the current time were `now`.
    ///
    /// Fails with [`PriceError::Locked`] while another cache holds the file.
    pub fn load_at(source: Box<dyn PriceSource>, now: NaiveDateTime) -> Result<Self, PriceError> {
        let path = source.file_path().to_path_buf();
        let lock = CacheLock::acquire(&path)?;
        let mut cache = Self {
            source,
            path,
            _lock: lock,
            expiry: fresh_expiry(now),
            prices: BTreeMap::new(),
            banned: HashSet::new(),
            special: HashMap::new(),
            retry: RetryPolicy::default(),
        };

        if !cache.path.exists() {
            debug!("No price cache at {}", cache.path.display());
            return Ok(cache);
        }

        let content = std::fs::read_to_string(&cache.path).map_err(|source| PriceError::CacheFile {
            path: cache.path.clone(),
            source,
        })?;
        cache.read_entries(&content, now);
        Ok(cache)
    }

    fn read_entries(&mut self, content: &str, now: NaiveDateTime) {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let Some(first) = lines.next() else {
            return;
        };
        match NaiveDateTime::parse_from_str(first.trim(), DATA_EXPIRY_TIME_LAYOUT) {
            Ok(expiry) if expiry < now => {
                info!(
                    "Price cache {} expired at {}; starting afresh",
                    self.path.display(),
                    expiry
                );
                return;
            }
            Ok(expiry) => self.expiry = expiry,
            Err(e) => {
                warn!(
                    "Unreadable expiry \"{}\" in {}: {}; starting afresh",
                    first,
                    self.path.display(),
                    e
                );
                return;
            }
        }

        for line in lines {
            let Some((name, price)) = line.rsplit_once('|') else {
                warn!("Skipping malformed price cache line \"{}\"", line);
                continue;
            };
            match price.trim().parse::<f64>() {
                Ok(price) if price >= 0.0 => {
                    self.prices.insert(name.to_string(), price);
                }
                _ => warn!("Skipping malformed price cache line \"{}\"", line),
            }
        }
        debug!("Loaded {} cached prices", self.prices.len());
    }

    /// Names that always price at 0 and are never cached
    pub fn with_banned<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.banned.extend(names.into_iter().map(Into::into));
        self
    }

    /// Fixed prices used ahead of the remote source, never persisted
    pub fn with_special_prices<I, S>(mut self, prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.special
            .extend(prices.into_iter().map(|(name, price)| (name.into(), price)));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn expiry(&self) -> NaiveDateTime {
        self.expiry
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Cached price without any lookup
    pub fn cached(&self, name: &str) -> Option<f64> {
        self.prices.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Unit price of `name`, looking it up remotely on a miss.
    ///
    /// Failed or zero lookups return 0 and are not cached.
    pub fn price(&mut self, name: &str) -> f64 {
        if name == NOTHING || self.banned.contains(name) {
            return 0.0;
        }
        if let Some(price) = self.prices.get(name) {
            return *price;
        }
        if let Some(price) = self.special.get(name) {
            return *price;
        }

        let source = &self.source;
        match self.retry.execute(|| source.price(name)) {
            Ok(price) if price > 0.0 => {
                debug!("{} priced at {} by {}", name, price, source.name());
                self.prices.insert(name.to_string(), price);
                price
            }
            Ok(_) | Err(PriceError::NoPrice(_)) => {
                warn!("No price for \"{}\" from {}", name, source.name());
                0.0
            }
            Err(e) => {
                warn!("Failed to price \"{}\" from {}: {}", name, source.name(), e);
                0.0
            }
        }
    }

    /// Prices for every name, in one table
    pub fn prices_for<'a, I>(&mut self, names: I) -> PriceTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| (name, self.price(name)))
            .collect()
    }

    fn serialise(&self) -> String {
        let mut out = format!("{}\n", self.expiry.format(DATA_EXPIRY_TIME_LAYOUT));
        for (name, price) in &self.prices {
            let _ = writeln!(out, "{}|{:.6}", name, price);
        }
        out
    }

    /// Rewrite the whole cache file
    pub fn flush(&self) -> Result<(), PriceError> {
        let io_err = |source| PriceError::CacheFile {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, self.serialise()).map_err(io_err)?;
        debug!("Wrote {} prices to {}", self.prices.len(), self.path.display());
        Ok(())
    }

    /// Flush and release the file
    pub fn close(self) -> Result<(), PriceError> {
        self.flush()
    }
}

impl std::fmt::Debug for PriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceCache")
            .field("source", &self.source.name())
            .field("path", &self.path)
            .field("expiry", &self.expiry)
            .field("entries", &self.prices.len())
            .finish()
    }
}
