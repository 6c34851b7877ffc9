//! Single item price lookup

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::commands::{emit, open_cache};
use crate::config::Settings;
use crate::report::format_np;

#[derive(Debug, Serialize)]
struct PriceLookup<'a> {
    name: &'a str,
    source: &'a str,
    price: f64,
    cached: bool,
}

/// Handle the price command
pub fn handle(settings: &Settings, name: &str, format: OutputFormat) -> Result<()> {
    let mut cache = open_cache(settings)?;
    let cached = cache.cached(name).is_some();
    let price = cache.price(name);

    let source = cache.source_name().to_string();
    let lines = vec![format!(
        "{}: {} ({}{})",
        name,
        format_np(price),
        source,
        if cached { ", cached" } else { "" }
    )];
    let lookup = PriceLookup {
        name,
        source: &source,
        price,
        cached,
    };
    emit(format, &lines, &lookup)?;

    cache.close().context("Failed to save price cache")
}
