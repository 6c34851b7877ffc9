//! Profit and drop-rate analysis of one set of normalised drops.
//!
//! Prices come from a [`PriceTable`] resolved up front, so everything here is
//! a pure function of its inputs. `nothing` never contributes to a rate or a
//! profit, and items priced at 0 are left out of the per-drop profit series.

use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::arena::{Arena, DropMetadata};
use crate::constants::{BATTLEDOME_DROPS_PER_DAY, NOTHING};
use crate::drops::{BattledomeItem, NormalisedDrops};
use crate::price::PriceTable;
use crate::stats::{bootstrap_sum_interval_with, clopper_pearson, ResultStatistics, StatsResult};

/// Share of real drops taken by one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDropRate {
    pub metadata: DropMetadata,
    pub name: String,
    pub rate: f64,
}

impl ItemDropRate {
    /// Rate of every item except `nothing`
    pub fn from_drops(drops: &NormalisedDrops) -> BTreeMap<String, ItemDropRate> {
        drops
            .items()
            .filter(|item| !item.is_nothing())
            .map(|item| {
                (
                    item.name.clone(),
                    ItemDropRate {
                        metadata: item.metadata.clone(),
                        name: item.name.clone(),
                        rate: drops.drop_rate(&item.name),
                    },
                )
            })
            .collect()
    }
}

/// A drop rate valued at a unit price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemProfit {
    pub drop_rate: ItemDropRate,
    pub price: f64,
    /// Share of the summed profit of all items
    pub percentage: f64,
}

impl ItemProfit {
    pub fn name(&self) -> &str {
        &self.drop_rate.name
    }

    pub fn rate(&self) -> f64 {
        self.drop_rate.rate
    }

    /// Expected value of one drop slot from this item
    pub fn profit(&self) -> f64 {
        self.drop_rate.rate * self.price
    }

    /// Expected value over a day of drops
    pub fn expectation(&self) -> f64 {
        self.profit() * f64::from(BATTLEDOME_DROPS_PER_DAY)
    }
}

/// Per-item profit summary, scaled to a day on request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisStatistics {
    pub arena: Arena,
    pub mean_item_profit: f64,
    pub median_item_profit: f64,
    pub stdev_item_profit: f64,
}

impl AnalysisStatistics {
    pub fn from_result(arena: Arena, result: &ResultStatistics) -> Self {
        Self {
            arena,
            mean_item_profit: result.mean,
            median_item_profit: result.median,
            stdev_item_profit: result.stdev,
        }
    }

    pub fn mean_day(&self) -> f64 {
        self.mean_item_profit * f64::from(BATTLEDOME_DROPS_PER_DAY)
    }

    pub fn stdev_day(&self) -> f64 {
        self.stdev_item_profit * f64::from(BATTLEDOME_DROPS_PER_DAY).sqrt()
    }
}

/// The per-drop profit series: each priced item's unit price repeated
/// once per unit dropped.
///
/// Stored as `(price, quantity)` runs so that synthetic samples of 10^8
/// drops never need expanding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfitSeries {
    runs: Vec<(f64, u64)>,
    cumulative: Vec<u64>,
}

impl ProfitSeries {
    pub fn from_drops(drops: &NormalisedDrops, prices: &PriceTable) -> Self {
        let runs: Vec<(f64, u64)> = drops
            .items()
            .filter(|item| !item.is_nothing() && item.quantity > 0)
            .map(|item| (prices.get(&item.name), item.quantity))
            .filter(|(price, _)| *price > 0.0)
            .collect();

        let mut running = 0;
        let cumulative = runs
            .iter()
            .map(|(_, quantity)| {
                running += quantity;
                running
            })
            .collect();

        Self { runs, cumulative }
    }

    /// Number of drops in the series
    pub fn len(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn runs(&self) -> &[(f64, u64)] {
        &self.runs
    }

    /// The series expanded, one value per drop
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.runs
            .iter()
            .flat_map(|&(price, quantity)| std::iter::repeat(price).take(quantity as usize))
    }

    pub fn statistics(&self) -> ResultStatistics {
        ResultStatistics::from_weighted(&self.runs)
    }

    /// One value drawn uniformly from the expanded series
    pub fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let total = self.len();
        if total == 0 {
            return 0.0;
        }
        let sample = rng.gen_range(0..total);
        let index = self.cumulative.partition_point(|&c| c <= sample);
        self.runs.get(index).map_or(0.0, |run| run.0)
    }

    /// Bootstrap interval on the profit of one day of drops
    pub fn day_interval<R: Rng>(&self, rounds: usize, alpha: f64, rng: &mut R) -> (f64, f64) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        bootstrap_sum_interval_with(BATTLEDOME_DROPS_PER_DAY, rounds, alpha, rng, |rng| {
            self.draw(rng)
        })
    }
}

fn item_value(item: &BattledomeItem, prices: &PriceTable) -> f64 {
    item.quantity as f64 * prices.get(&item.name)
}

/// Sum of quantity times price over real, priced items
pub fn total_profit(drops: &NormalisedDrops, prices: &PriceTable) -> f64 {
    drops
        .items()
        .filter(|item| !item.is_nothing())
        .map(|item| item_value(item, prices))
        .filter(|value| *value > 0.0)
        .sum()
}

fn by_descending_key<'a>(mut items: Vec<(f64, &'a BattledomeItem)>) -> Vec<&'a BattledomeItem> {
    items.sort_by(|a, b| match b.0.total_cmp(&a.0) {
        Ordering::Equal => a.1.name.cmp(&b.1.name),
        other => other,
    });
    items.into_iter().map(|(_, item)| item).collect()
}

fn ordered_by<'a, F>(
    drops: &'a NormalisedDrops,
    prices: &PriceTable,
    mut key: F,
) -> Vec<&'a BattledomeItem>
where
    F: FnMut(&BattledomeItem) -> f64,
{
    by_descending_key(
        drops
            .items()
            .filter(|item| !item.is_nothing() && prices.get(&item.name) > 0.0)
            .map(|item| (key(item), item))
            .collect(),
    )
}

/// Priced real items by descending quantity times price, then by name
pub fn items_by_profit<'a>(
    drops: &'a NormalisedDrops,
    prices: &PriceTable,
) -> Vec<&'a BattledomeItem> {
    ordered_by(drops, prices, |item| item_value(item, prices))
}

/// Priced real items by descending unit price, then by name
pub fn items_by_price<'a>(
    drops: &'a NormalisedDrops,
    prices: &PriceTable,
) -> Vec<&'a BattledomeItem> {
    ordered_by(drops, prices, |item| prices.get(&item.name))
}

/// Every real item, priced or not, in the same order as [`items_by_profit`]
/// with unpriced items last
pub fn all_items_by_profit<'a>(
    drops: &'a NormalisedDrops,
    prices: &PriceTable,
) -> Vec<&'a BattledomeItem> {
    by_descending_key(
        drops
            .items()
            .filter(|item| !item.is_nothing())
            .map(|item| (item_value(item, prices), item))
            .collect(),
    )
}

/// Drop rates valued at `prices`, with each item's share of the total
pub fn item_profits(drops: &NormalisedDrops, prices: &PriceTable) -> BTreeMap<String, ItemProfit> {
    let mut profits: BTreeMap<String, ItemProfit> = ItemDropRate::from_drops(drops)
        .into_iter()
        .map(|(name, drop_rate)| {
            let price = prices.get(&name);
            (
                name,
                ItemProfit {
                    drop_rate,
                    price,
                    percentage: 0.0,
                },
            )
        })
        .collect();

    let total: f64 = profits.values().map(ItemProfit::profit).sum();
    if total > 0.0 {
        for profit in profits.values_mut() {
            profit.percentage = profit.profit() / total;
        }
    }
    profits
}

/// Everything derived from one set of drops and its prices
#[derive(Debug, Clone, Serialize)]
pub struct DropsAnalysis {
    pub drops: NormalisedDrops,
    pub prices: PriceTable,
    pub profits: BTreeMap<String, ItemProfit>,
    pub statistics: AnalysisStatistics,
    pub result: ResultStatistics,
    /// Bootstrap interval on one day's profit
    pub day_interval: (f64, f64),
}

impl DropsAnalysis {
    pub fn new(
        drops: NormalisedDrops,
        prices: PriceTable,
        bootstrap_rounds: usize,
        alpha: f64,
    ) -> Self {
        Self::with_rng(drops, prices, bootstrap_rounds, alpha, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng>(
        drops: NormalisedDrops,
        prices: PriceTable,
        bootstrap_rounds: usize,
        alpha: f64,
        rng: &mut R,
    ) -> Self {
        let series = ProfitSeries::from_drops(&drops, &prices);
        let result = series.statistics();
        let day_interval = series.day_interval(bootstrap_rounds, alpha, rng);
        Self {
            profits: item_profits(&drops, &prices),
            statistics: AnalysisStatistics::from_result(drops.arena(), &result),
            result,
            day_interval,
            drops,
            prices,
        }
    }

    pub fn metadata(&self) -> &DropMetadata {
        self.drops.metadata()
    }

    pub fn arena(&self) -> Arena {
        self.drops.arena()
    }

    pub fn mean_day(&self) -> f64 {
        self.statistics.mean_day()
    }

    pub fn stdev_day(&self) -> f64 {
        self.statistics.stdev_day()
    }

    /// Real drops recorded
    pub fn samples(&self) -> u64 {
        self.drops.total_quantity()
    }

    pub fn total_profit(&self) -> f64 {
        total_profit(&self.drops, &self.prices)
    }

    /// Up to `n` items, most profitable first
    pub fn top_by_profit(&self, n: usize) -> Vec<&ItemProfit> {
        items_by_profit(&self.drops, &self.prices)
            .into_iter()
            .filter_map(|item| self.profits.get(&item.name))
            .take(n)
            .collect()
    }

    /// Clopper-Pearson interval on the drop rate of `name`
    pub fn rate_interval(&self, name: &str, alpha: f64) -> StatsResult<(f64, f64)> {
        let quantity = if name == NOTHING { 0 } else { self.drops.quantity(name) };
        clopper_pearson(quantity, self.drops.total_quantity(), alpha)
    }
}
