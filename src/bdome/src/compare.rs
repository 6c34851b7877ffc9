//! Empirical versus synthetic comparisons.
//!
//! The engine owns every input the comparisons need and hands back plain
//! result values. Presentation code only ever sees those values.

use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::{all_items_by_profit, DropsAnalysis, ItemDropRate};
use crate::arena::{Arena, ChallengerKey, DropMetadata};
use crate::constants::{
    BROWN_CODESTONES, NOTHING, NUMBER_OF_BOOTSTRAP_SAMPLES, RED_CODESTONES, SIGNIFICANCE_LEVEL,
};
use crate::dropfile::DropDataSet;
use crate::drops::{DropsError, NormalisedDrops};
use crate::price::{PriceCache, PriceError, PriceTable};
use crate::stats::{clopper_pearson, StatsError};
use crate::store::{DropRateStore, GeneratedDropsStore, StoreError};
use crate::weights::WeightTable;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Combining drops for {context} failed: {source}")]
    Drops {
        context: String,
        #[source]
        source: DropsError,
    },

    #[error("Synthetic drops for {arena}: {source}")]
    Store {
        arena: Arena,
        #[source]
        source: StoreError,
    },

    #[error("Statistics for {context}: {source}")]
    Stats {
        context: String,
        #[source]
        source: StatsError,
    },

    #[error(transparent)]
    Price(#[from] PriceError),
}

pub type CompareResult<T> = Result<T, CompareError>;

/// Empirical and synthetic analyses of the same selection
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub actual: DropsAnalysis,
    pub predicted: DropsAnalysis,
}

impl Comparison {
    /// Actual minus predicted mean day profit
    pub fn difference(&self) -> f64 {
        self.actual.mean_day() - self.predicted.mean_day()
    }
}

/// One codestone's predicted rate against its observed rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodestoneRow {
    pub name: String,
    pub predicted_rate: f64,
    pub actual_rate: f64,
    pub actual_interval: (f64, f64),
}

/// Drop rates for one codestone colour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodestoneSummary {
    pub title: String,
    pub rows: Vec<CodestoneRow>,
    pub predicted_total: f64,
    pub actual_total: f64,
    pub actual_total_interval: (f64, f64),
}

impl CodestoneSummary {
    /// Rows are in name order. Predicted rates come from `predicted`, the
    /// stored per-item rates of the arena.
    pub fn new(
        title: &str,
        stones: &[&str],
        actual: &NormalisedDrops,
        predicted: &BTreeMap<String, ItemDropRate>,
        alpha: f64,
    ) -> Result<Self, StatsError> {
        let mut names: Vec<&str> = stones.to_vec();
        names.sort_unstable();

        let trials = actual.total_quantity();
        let mut rows = Vec::with_capacity(names.len());
        let mut actual_count = 0;
        for name in names {
            let quantity = actual.quantity(name);
            actual_count += quantity;
            rows.push(CodestoneRow {
                name: name.to_string(),
                predicted_rate: predicted.get(name).map_or(0.0, |r| r.rate),
                actual_rate: actual.drop_rate(name),
                actual_interval: clopper_pearson(quantity, trials, alpha)?,
            });
        }

        Ok(Self {
            title: title.to_string(),
            predicted_total: rows.iter().map(|r| r.predicted_rate).sum(),
            actual_total: rows.iter().map(|r| r.actual_rate).sum(),
            actual_total_interval: clopper_pearson(actual_count, trials, alpha)?,
            rows,
        })
    }

    pub fn brown(
        actual: &NormalisedDrops,
        predicted: &BTreeMap<String, ItemDropRate>,
        alpha: f64,
    ) -> Result<Self, StatsError> {
        Self::new("Brown Codestone Drop Rates", &BROWN_CODESTONES, actual, predicted, alpha)
    }

    pub fn red(
        actual: &NormalisedDrops,
        predicted: &BTreeMap<String, ItemDropRate>,
        alpha: f64,
    ) -> Result<Self, StatsError> {
        Self::new("Red Codestone Drop Rates", &RED_CODESTONES, actual, predicted, alpha)
    }
}

/// One observed item within an arena/challenger split
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropClassRow {
    pub name: String,
    pub quantity: u64,
    pub rate: f64,
    pub rate_interval: (f64, f64),
    pub price: f64,
    /// Expected profit per day
    pub expectation: f64,
    /// Share of the expectation of every observed item
    pub share: f64,
}

/// Observed items that either are or are not in an arena's weight table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropClassSummary {
    /// Ordered by quantity times price, most valuable first
    pub rows: Vec<DropClassRow>,
    pub quantity: u64,
    pub rate: f64,
    pub rate_interval: (f64, f64),
    pub expectation: f64,
    pub share: f64,
}

/// Arena-specific against challenger-specific drops
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropSplit {
    pub arena_specific: DropClassSummary,
    pub challenger_specific: DropClassSummary,
}

impl DropSplit {
    /// An observed item is arena-specific when the synthetic sample for the
    /// same arena contains it
    pub fn new(
        actual: &DropsAnalysis,
        predicted: &NormalisedDrops,
        alpha: f64,
    ) -> Result<Self, StatsError> {
        let total = actual.profits.values().map(|p| p.expectation()).sum();
        Ok(Self {
            arena_specific: Self::class(actual, total, alpha, |name| predicted.contains(name))?,
            challenger_specific: Self::class(actual, total, alpha, |name| {
                !predicted.contains(name)
            })?,
        })
    }

    fn class<F>(
        actual: &DropsAnalysis,
        total_expectation: f64,
        alpha: f64,
        mut member: F,
    ) -> Result<DropClassSummary, StatsError>
    where
        F: FnMut(&str) -> bool,
    {
        let trials = actual.drops.total_quantity();
        let share = |value: f64| {
            if total_expectation > 0.0 {
                value / total_expectation
            } else {
                0.0
            }
        };

        let mut rows = Vec::new();
        for item in all_items_by_profit(&actual.drops, &actual.prices) {
            if !member(&item.name) {
                continue;
            }
            let (rate, expectation) = actual
                .profits
                .get(&item.name)
                .map_or((0.0, 0.0), |p| (p.rate(), p.expectation()));
            rows.push(DropClassRow {
                name: item.name.clone(),
                quantity: item.quantity,
                rate,
                rate_interval: clopper_pearson(item.quantity, trials, alpha)?,
                price: actual.prices.get(&item.name),
                expectation,
                share: share(expectation),
            });
        }

        let quantity: u64 = rows.iter().map(|r| r.quantity).sum();
        let expectation: f64 = rows.iter().map(|r| r.expectation).sum();
        Ok(DropClassSummary {
            quantity,
            rate: rows.iter().map(|r| r.rate).sum(),
            rate_interval: clopper_pearson(quantity, trials, alpha)?,
            expectation,
            share: share(expectation),
            rows,
        })
    }

    /// Fraction of observed real drops that are arena-specific
    pub fn arena_rate(&self) -> f64 {
        let total = self.arena_specific.quantity + self.challenger_specific.quantity;
        if total == 0 {
            return 0.0;
        }
        self.arena_specific.quantity as f64 / total as f64
    }

    pub fn challenger_rate(&self) -> f64 {
        let total = self.arena_specific.quantity + self.challenger_specific.quantity;
        if total == 0 {
            return 0.0;
        }
        self.challenger_specific.quantity as f64 / total as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArenaComparison {
    pub arena: Arena,
    pub comparison: Comparison,
    pub brown: CodestoneSummary,
    pub red: CodestoneSummary,
    /// Whether challenger-specific drops were removed from the actual side
    pub arena_drops_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengerComparison {
    pub key: ChallengerKey,
    pub comparison: Comparison,
    pub brown: CodestoneSummary,
    pub red: CodestoneSummary,
    pub split: DropSplit,
}

/// One line of the all-challengers overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengerSummary {
    pub key: ChallengerKey,
    pub samples: u64,
    pub actual_mean: f64,
    pub actual_interval: (f64, f64),
    pub predicted_mean: f64,
    pub predicted_interval: (f64, f64),
    pub arena_rate: f64,
    pub challenger_rate: f64,
}

/// One line of the brief all-arenas overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaSummary {
    pub arena: Arena,
    pub samples: u64,
    pub actual_mean: f64,
    pub actual_interval: (f64, f64),
    pub predicted_mean: f64,
    pub predicted_interval: (f64, f64),
}

/// A batch entry that may have failed on its own
#[derive(Debug)]
pub struct Outcome<K, T> {
    pub key: K,
    pub result: CompareResult<T>,
}

/// Joins recorded drops with synthetic samples and prices both
pub struct ComparisonEngine {
    drops: DropDataSet,
    weights: WeightTable,
    generated: GeneratedDropsStore,
    rates: DropRateStore,
    cache: PriceCache,
    synthetic: BTreeMap<Arena, NormalisedDrops>,
    ignore_challenger_drops: bool,
    bootstrap_rounds: usize,
    alpha: f64,
    progress: Option<ProgressBar>,
}

impl ComparisonEngine {
    pub fn new(
        drops: DropDataSet,
        weights: WeightTable,
        generated: GeneratedDropsStore,
        rates: DropRateStore,
        cache: PriceCache,
    ) -> Self {
        Self {
            drops,
            weights,
            generated,
            rates,
            cache,
            synthetic: BTreeMap::new(),
            ignore_challenger_drops: true,
            bootstrap_rounds: NUMBER_OF_BOOTSTRAP_SAMPLES,
            alpha: SIGNIFICANCE_LEVEL,
            progress: None,
        }
    }

    /// Drop challenger-specific items from arena-level actuals (default on)
    pub fn with_ignore_challenger_drops(mut self, ignore: bool) -> Self {
        self.ignore_challenger_drops = ignore;
        self
    }

    pub fn with_bootstrap_rounds(mut self, rounds: usize) -> Self {
        self.bootstrap_rounds = rounds;
        self
    }

    /// Progress bar ticked while synthetic drops are generated
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn drops(&self) -> &DropDataSet {
        &self.drops
    }

    pub fn significance(&self) -> f64 {
        self.alpha
    }

    /// Flush the price cache and release it
    pub fn close(self) -> CompareResult<()> {
        self.cache.close()?;
        Ok(())
    }

    /// Synthetic drops for `arena`, loaded or generated once per engine
    pub fn synthetic(&mut self, arena: Arena) -> CompareResult<NormalisedDrops> {
        if let Some(drops) = self.synthetic.get(&arena) {
            return Ok(drops.clone());
        }

        if let Some(pb) = &self.progress {
            pb.reset();
            pb.set_length(self.generated.sample_count());
            pb.set_message(arena.to_string());
        }
        let drops = self
            .generated
            .get_or_generate(arena, &self.weights, self.progress.as_ref())
            .map_err(|source| CompareError::Store { arena, source })?;
        self.synthetic.insert(arena, drops.clone());
        Ok(drops)
    }

    /// Replace the stored synthetic sample for `arena` with a fresh one
    pub fn regenerate(&mut self, arena: Arena) -> CompareResult<NormalisedDrops> {
        let store_err = |source| CompareError::Store { arena, source };
        if let Some(pb) = &self.progress {
            pb.reset();
            pb.set_length(self.generated.sample_count());
            pb.set_message(arena.to_string());
        }
        let drops = self
            .generated
            .generate(arena, &self.weights, self.progress.as_ref())
            .map_err(store_err)?;
        self.generated.save(&drops).map_err(store_err)?;
        let rates = ItemDropRate::from_drops(&drops);
        self.rates.save(arena, &rates).map_err(store_err)?;
        self.synthetic.insert(arena, drops.clone());
        Ok(drops)
    }

    /// Predicted per-item drop rates for `arena`.
    ///
    /// The stored rate file is used as is when present. Otherwise the rates
    /// are derived from the synthetic sample and stored.
    pub fn predicted_rates(
        &mut self,
        arena: Arena,
    ) -> CompareResult<BTreeMap<String, ItemDropRate>> {
        let store_err = |source| CompareError::Store { arena, source };
        if let Some(rates) = self.rates.load(arena).map_err(store_err)? {
            debug!("Loaded drop rates from {}", self.rates.path(arena).display());
            return Ok(rates);
        }
        let drops = self.synthetic(arena)?;
        let rates = ItemDropRate::from_drops(&drops);
        self.rates.save(arena, &rates).map_err(store_err)?;
        Ok(rates)
    }

    /// Unit prices for every item in `drops`
    pub fn prices(&mut self, drops: &NormalisedDrops) -> PriceTable {
        self.cache
            .prices_for(drops.names().filter(|name| *name != NOTHING))
    }

    pub fn analyse(&mut self, drops: NormalisedDrops) -> DropsAnalysis {
        let prices = self.prices(&drops);
        DropsAnalysis::new(drops, prices, self.bootstrap_rounds, self.alpha)
    }

    fn comparison(&mut self, actual: NormalisedDrops, predicted: NormalisedDrops) -> Comparison {
        Comparison {
            actual: self.analyse(actual),
            predicted: self.analyse(predicted),
        }
    }

    /// Empirical drops for `arena`, restricted to arena drops when configured
    fn arena_actuals(
        &self,
        arena: Arena,
        synthetic: &NormalisedDrops,
    ) -> CompareResult<NormalisedDrops> {
        let actual = self.drops.by_arena(arena).map_err(|source| CompareError::Drops {
            context: arena.to_string(),
            source,
        })?;
        if !self.ignore_challenger_drops {
            return Ok(actual);
        }
        Ok(actual.filtered(|item| item.is_nothing() || synthetic.contains(&item.name)))
    }

    fn stats_err(context: impl std::fmt::Display) -> impl FnOnce(StatsError) -> CompareError {
        let context = context.to_string();
        move |source| CompareError::Stats { context, source }
    }

    pub fn compare_arena(&mut self, arena: Arena) -> CompareResult<ArenaComparison> {
        let synthetic = self.synthetic(arena)?;
        let actual = self.arena_actuals(arena, &synthetic)?;
        debug!(
            "Comparing {} recorded drops in {} against {} generated",
            actual.total_quantity(),
            arena,
            synthetic.total_quantity()
        );

        let rates = self.predicted_rates(arena)?;
        let comparison = self.comparison(actual, synthetic);
        let brown = CodestoneSummary::brown(&comparison.actual.drops, &rates, self.alpha)
            .map_err(Self::stats_err(arena))?;
        let red = CodestoneSummary::red(&comparison.actual.drops, &rates, self.alpha)
            .map_err(Self::stats_err(arena))?;

        Ok(ArenaComparison {
            arena,
            comparison,
            brown,
            red,
            arena_drops_only: self.ignore_challenger_drops,
        })
    }

    pub fn compare_challenger(
        &mut self,
        key: &ChallengerKey,
    ) -> CompareResult<ChallengerComparison> {
        let synthetic = self.synthetic(key.arena)?;
        let mut actual = self.drops.by_key(key).map_err(|source| CompareError::Drops {
            context: key.to_string(),
            source,
        })?;
        if actual.is_empty() {
            warn!("No drops recorded for {}", key);
            actual = NormalisedDrops::with_metadata(DropMetadata::new(
                "",
                key.arena,
                key.challenger.clone(),
                key.difficulty.clone(),
            ));
        }

        let rates = self.predicted_rates(key.arena)?;
        let comparison = self.comparison(actual, synthetic);
        let brown = CodestoneSummary::brown(&comparison.actual.drops, &rates, self.alpha)
            .map_err(Self::stats_err(key))?;
        let red = CodestoneSummary::red(&comparison.actual.drops, &rates, self.alpha)
            .map_err(Self::stats_err(key))?;
        let split = DropSplit::new(&comparison.actual, &comparison.predicted.drops, self.alpha)
            .map_err(Self::stats_err(key))?;

        Ok(ChallengerComparison {
            key: key.clone(),
            comparison,
            brown,
            red,
            split,
        })
    }

    fn summarise_challenger(
        &mut self,
        key: &ChallengerKey,
        actual: NormalisedDrops,
    ) -> CompareResult<ChallengerSummary> {
        let synthetic = self.synthetic(key.arena)?;
        let comparison = self.comparison(actual, synthetic);
        let split = DropSplit::new(&comparison.actual, &comparison.predicted.drops, self.alpha)
            .map_err(Self::stats_err(key))?;

        Ok(ChallengerSummary {
            key: key.clone(),
            samples: comparison.actual.samples(),
            actual_mean: comparison.actual.mean_day(),
            actual_interval: comparison.actual.day_interval,
            predicted_mean: comparison.predicted.mean_day(),
            predicted_interval: comparison.predicted.day_interval,
            arena_rate: split.arena_rate(),
            challenger_rate: split.challenger_rate(),
        })
    }

    /// Every recorded `(arena, challenger, difficulty)`, most profitable first.
    ///
    /// A group that fails keeps its place in the batch with its error and
    /// sorts as zero profit.
    pub fn compare_all_challengers(
        &mut self,
    ) -> CompareResult<Vec<Outcome<ChallengerKey, ChallengerSummary>>> {
        let groups = self.drops.grouped_by_key().map_err(|source| CompareError::Drops {
            context: "all challengers".to_string(),
            source,
        })?;

        let mut outcomes: Vec<Outcome<ChallengerKey, ChallengerSummary>> = groups
            .into_iter()
            .map(|(key, actual)| {
                let result = self.summarise_challenger(&key, actual);
                if let Err(e) = &result {
                    warn!("Comparison for {} failed: {}", key, e);
                }
                Outcome { key, result }
            })
            .collect();

        outcomes.sort_by(|a, b| {
            outcome_mean(b, |s| s.actual_mean).total_cmp(&outcome_mean(a, |s| s.actual_mean))
        });
        Ok(outcomes)
    }

    fn summarise_arena(&mut self, arena: Arena) -> CompareResult<ArenaSummary> {
        let synthetic = self.synthetic(arena)?;
        let actual = self.arena_actuals(arena, &synthetic)?;
        let comparison = self.comparison(actual, synthetic);
        Ok(ArenaSummary {
            arena,
            samples: comparison.actual.samples(),
            actual_mean: comparison.actual.mean_day(),
            actual_interval: comparison.actual.day_interval,
            predicted_mean: comparison.predicted.mean_day(),
            predicted_interval: comparison.predicted.day_interval,
        })
    }

    /// Predicted and actual day profit for each arena, most profitable first
    pub fn compare_all_arenas_brief(
        &mut self,
        arenas: &[Arena],
    ) -> Vec<Outcome<Arena, ArenaSummary>> {
        let mut outcomes: Vec<Outcome<Arena, ArenaSummary>> = arenas
            .iter()
            .map(|&arena| {
                let result = self.summarise_arena(arena);
                if let Err(e) = &result {
                    warn!("Comparison for {} failed: {}", arena, e);
                }
                Outcome { key: arena, result }
            })
            .collect();

        outcomes.sort_by(|a, b| {
            outcome_mean(b, |s| s.actual_mean).total_cmp(&outcome_mean(a, |s| s.actual_mean))
        });
        outcomes
    }
}

fn outcome_mean<K, T>(outcome: &Outcome<K, T>, mean: impl Fn(&T) -> f64) -> f64 {
    outcome.result.as_ref().map_or(0.0, mean)
}

impl std::fmt::Debug for ComparisonEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonEngine")
            .field("files", &self.drops.len())
            .field("sample_count", &self.generated.sample_count())
            .field("cache", &self.cache)
            .field("ignore_challenger_drops", &self.ignore_challenger_drops)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drops::Drops;
    use crate::price::PriceSource;
    use std::path::{Path, PathBuf};

    struct TablePrices {
        path: PathBuf,
        prices: BTreeMap<String, f64>,
    }

    impl PriceSource for TablePrices {
        fn name(&self) -> &str {
            "table"
        }

        fn price(&self, item: &str) -> Result<f64, PriceError> {
            Ok(self.prices.get(item).copied().unwrap_or(0.0))
        }

        fn file_path(&self) -> &Path {
            &self.path
        }
    }

    const WEIGHTS: &str = "\
Frost Arena
Snowball - 50%
Bri Codestone - 30%
Zed Codestone - 20%

Ugga Dome
Bone Club - 100%
";

    fn day(source: &str, challenger: &str, items: &[(&str, u64)]) -> Drops {
        let metadata = DropMetadata::new(source, Arena::FrostArena, challenger, "Mighty");
        let mut drops = Drops::new(metadata);
        for (name, quantity) in items {
            drops.push(*name, *quantity);
        }
        drops
    }

    fn engine(dir: &Path) -> ComparisonEngine {
        let source = TablePrices {
            path: dir.join("prices.txt"),
            prices: [
                ("Snowball", 100.0),
                ("Bri Codestone", 1_000.0),
                ("Zed Codestone", 5_000.0),
                ("Ice Crystal", 50_000.0),
                ("Bone Club", 10.0),
            ]
            .into_iter()
            .map(|(n, p)| (n.to_string(), p))
            .collect(),
        };
        let cache = PriceCache::load(Box::new(source)).unwrap();
        let files = vec![
            day(
                "a.txt",
                "Snow Faerie",
                &[("Snowball", 10), ("Bri Codestone", 4), ("Ice Crystal", 1)],
            ),
            day("b.txt", "Snow Faerie", &[("Snowball", 8), ("Zed Codestone", 2), (NOTHING, 5)]),
            day("c.txt", "Yeti", &[("Snowball", 15)]),
        ];
        ComparisonEngine::new(
            DropDataSet::from_drops(files),
            WeightTable::parse(WEIGHTS).unwrap(),
            GeneratedDropsStore::new(dir, 20_000),
            DropRateStore::new(dir, 20_000),
            cache,
        )
        .with_bootstrap_rounds(500)
    }

    #[test]
    fn test_compare_arena_ignores_challenger_drops() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());

        let result = engine.compare_arena(Arena::FrostArena).unwrap();
        assert!(result.arena_drops_only);
        assert!(!result.comparison.actual.drops.contains("Ice Crystal"));
        assert_eq!(result.comparison.actual.samples(), 39);
        assert_eq!(result.comparison.predicted.samples(), 20_000);
        assert_eq!(
            result.comparison.actual.metadata().challenger,
            crate::constants::MULTIPLE_CHALLENGERS
        );

        let predicted = result.comparison.predicted.mean_day();
        // 15 * (0.5 * 100 + 0.3 * 1000 + 0.2 * 5000)
        assert!((predicted - 20_250.0).abs() < 1_000.0);
    }

    #[test]
    fn test_compare_arena_keeping_challenger_drops() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path()).with_ignore_challenger_drops(false);
        let result = engine.compare_arena(Arena::FrostArena).unwrap();
        assert!(result.comparison.actual.drops.contains("Ice Crystal"));
        assert_eq!(result.comparison.actual.samples(), 40);
    }

    #[test]
    fn test_missing_arena_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let result = engine.compare_arena(Arena::UggaDome).unwrap();
        assert!(result.comparison.actual.drops.is_empty());
        assert_eq!(result.comparison.actual.mean_day(), 0.0);
        assert_eq!(result.comparison.predicted.mean_day(), 150.0);
    }

    #[test]
    fn test_arena_without_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let err = engine.compare_arena(Arena::CosmicDome).unwrap_err();
        assert!(matches!(err, CompareError::Store { arena: Arena::CosmicDome, .. }));
    }

    #[test]
    fn test_compare_challenger_split() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let key = ChallengerKey::new(Arena::FrostArena, "Snow Faerie", "Mighty");

        let result = engine.compare_challenger(&key).unwrap();
        assert_eq!(result.comparison.actual.samples(), 25);

        let split = &result.split;
        assert_eq!(split.challenger_specific.rows.len(), 1);
        assert_eq!(split.challenger_specific.rows[0].name, "Ice Crystal");
        assert_eq!(split.arena_specific.quantity, 24);
        assert!((split.arena_rate() - 24.0 / 25.0).abs() < 1e-12);
        assert!((split.arena_rate() + split.challenger_rate() - 1.0).abs() < 1e-12);
        assert!((split.arena_specific.share + split.challenger_specific.share - 1.0).abs() < 1e-9);

        // Arena rows ordered by quantity times price
        let names: Vec<&str> = split.arena_specific.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zed Codestone", "Bri Codestone", "Snowball"]);
    }

    #[test]
    fn test_unknown_challenger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let key = ChallengerKey::new(Arena::FrostArena, "Nobody", "Grand Master");
        let result = engine.compare_challenger(&key).unwrap();
        assert_eq!(result.comparison.actual.samples(), 0);
        assert_eq!(result.comparison.actual.metadata().challenger, "Nobody");
        assert_eq!(result.split.arena_rate(), 0.0);
    }

    #[test]
    fn test_codestones() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let key = ChallengerKey::new(Arena::FrostArena, "Snow Faerie", "Mighty");
        let result = engine.compare_challenger(&key).unwrap();

        assert_eq!(result.brown.rows.len(), BROWN_CODESTONES.len());
        let bri = result.brown.rows.iter().find(|r| r.name == "Bri Codestone").unwrap();
        assert_eq!(bri.actual_rate, 4.0 / 25.0);
        assert!(bri.actual_interval.0 < bri.actual_rate && bri.actual_rate < bri.actual_interval.1);
        assert!((bri.predicted_rate - 0.3).abs() < 0.02);

        let lu = result.brown.rows.iter().find(|r| r.name == "Lu Codestone").unwrap();
        assert_eq!(lu.actual_rate, 0.0);
        assert_eq!(lu.actual_interval.0, 0.0);

        assert!((result.red.actual_total - 2.0 / 25.0).abs() < 1e-12);
        let mut sorted: Vec<&str> = result.red.rows.iter().map(|r| r.name.as_str()).collect();
        sorted.sort_unstable();
        assert_eq!(sorted, result.red.rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_stored_rates_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let rates = DropRateStore::new(dir.path(), 20_000);
        std::fs::write(
            rates.path(Arena::FrostArena),
            "Frost Arena|Bri Codestone|0.125\nFrost Arena|Snowball|0.875\n",
        )
        .unwrap();

        let mut engine = engine(dir.path());
        let predicted = engine.predicted_rates(Arena::FrostArena).unwrap();
        assert_eq!(predicted.len(), 2);
        assert_eq!(predicted["Bri Codestone"].rate, 0.125);

        let result = engine.compare_arena(Arena::FrostArena).unwrap();
        let bri = result.brown.rows.iter().find(|r| r.name == "Bri Codestone").unwrap();
        assert_eq!(bri.predicted_rate, 0.125);
        assert_eq!(result.red.predicted_total, 0.0);
    }

    #[test]
    fn test_all_challengers_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let outcomes = engine.compare_all_challengers().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].key.challenger, "Snow Faerie");
        assert_eq!(outcomes[1].key.challenger, "Yeti");

        let yeti = outcomes[1].result.as_ref().unwrap();
        assert_eq!(yeti.samples, 15);
        assert_eq!(yeti.actual_mean, 1_500.0);
        assert_eq!(yeti.arena_rate, 1.0);
    }

    #[test]
    fn test_brief_arenas_keep_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let arenas = [Arena::UggaDome, Arena::CosmicDome, Arena::FrostArena];
        let outcomes = engine.compare_all_arenas_brief(&arenas);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].key, Arena::FrostArena);
        assert!(outcomes.iter().any(|o| o.key == Arena::CosmicDome && o.result.is_err()));
    }

    #[test]
    fn test_synthetic_loaded_once_and_rates_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let first = engine.synthetic(Arena::FrostArena).unwrap();
        let second = engine.synthetic(Arena::FrostArena).unwrap();
        assert_eq!(first, second);

        let rates = engine.predicted_rates(Arena::FrostArena).unwrap();
        assert_eq!(rates.len(), 3);
        assert!(DropRateStore::new(dir.path(), 20_000).path(Arena::FrostArena).exists());

        let regenerated = engine.regenerate(Arena::FrostArena).unwrap();
        assert_eq!(regenerated.total_quantity(), 20_000);
        engine.close().unwrap();
        assert!(dir.path().join("prices.txt").exists());
    }
}
