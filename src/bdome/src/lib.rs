//! # bdome
//!
//! Battledome loot-drop analysis library.
//!
//! This library provides functionality to:
//! - Parse recorded daily drop files and published per-arena item weights
//! - Draw large synthetic drop samples from the weights, in parallel
//! - Persist synthetic samples and derived drop rates for reproducible runs
//! - Price items through an expiring on-disk cache backed by a price site
//! - Compare recorded and synthetic drops by arena or by challenger
//!
//! ## Example
//!
//! ```no_run
//! use bdome::{
//!     Arena, ComparisonEngine, DropDataSet, DropRateStore, GeneratedDropsStore, HtmlPriceSource,
//!     PriceCache, PriceSourceKind, WeightTable,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HtmlPriceSource::new(PriceSourceKind::JellyNeo, "data");
//! let mut engine = ComparisonEngine::new(
//!     DropDataSet::load_dir("battledome_drop_data")?,
//!     WeightTable::load("data/neopets_battledome_item_weights.txt")?,
//!     GeneratedDropsStore::new("data", 1_000_000),
//!     DropRateStore::new("data", 1_000_000),
//!     PriceCache::load(Box::new(source))?,
//! );
//!
//! let result = engine.compare_arena(Arena::CentralArena)?;
//! println!("Predicted: {:.0} NP/day", result.comparison.predicted.mean_day());
//! println!("Actual:    {:.0} NP/day", result.comparison.actual.mean_day());
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod arena;
pub mod compare;
pub mod constants;
pub mod dropfile;
pub mod drops;
pub mod price;
pub mod sampler;
pub mod stats;
pub mod store;
pub mod weights;

#[doc(inline)]
pub use analysis::{
    all_items_by_profit, item_profits, items_by_price, items_by_profit, total_profit,
    AnalysisStatistics, DropsAnalysis, ItemDropRate, ItemProfit, ProfitSeries,
};
#[doc(inline)]
pub use arena::{Arena, ChallengerKey, DropMetadata, UnknownArena};
#[doc(inline)]
pub use compare::{
    ArenaComparison, ArenaSummary, ChallengerComparison, ChallengerSummary, CodestoneRow,
    CodestoneSummary, CompareError, Comparison, ComparisonEngine, DropClassRow,
    DropClassSummary, DropSplit, Outcome,
};
#[doc(inline)]
pub use dropfile::{parse_file, DropDataSet, ParseError};
#[doc(inline)]
pub use drops::{BattledomeItem, Drops, DropsError, NormalisedDrops};
#[doc(inline)]
pub use price::{
    HtmlPriceSource, PriceCache, PriceError, PriceSource, PriceSourceKind, PriceTable,
    RetryPolicy,
};
#[doc(inline)]
pub use sampler::{SampleError, WeightedSampler};
#[doc(inline)]
pub use stats::{clopper_pearson, dry_chance, ResultStatistics, StatsError};
#[doc(inline)]
pub use store::{DropRateStore, GeneratedDropsStore, StoreError};
#[doc(inline)]
pub use weights::{ItemWeight, WeightTable, WeightsError};
