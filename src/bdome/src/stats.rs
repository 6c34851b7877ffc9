//! Numeric building blocks: summary statistics, binomial intervals and
//! bootstrap percentiles.
//!
//! Every summary of an empty series is 0 rather than an error.

use rand::Rng;
use serde::Serialize;
use statrs::distribution::{Beta, ContinuousCDF, StudentsT};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Distribution error: {0}")]
    Distribution(String),
}

pub type StatsResult<T> = Result<T, StatsError>;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Bessel-corrected standard deviation (divisor `n - 1`)
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Summary of a per-drop series, with helpers to scale it to `k` drops
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResultStatistics {
    pub sample_size: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
}

impl ResultStatistics {
    pub fn from_series(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            sample_size: values.len(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: mean(values),
            median: median(values),
            stdev: sample_stdev(values),
        }
    }

    /// Same summary as [`from_series`](Self::from_series) over a series
    /// given as `(value, repeat count)` pairs, without expanding it
    pub fn from_weighted(pairs: &[(f64, u64)]) -> Self {
        let mut sorted: Vec<(f64, u64)> = pairs.iter().copied().filter(|(_, c)| *c > 0).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n: u64 = sorted.iter().map(|(_, c)| c).sum();
        let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
            return Self::default();
        };

        let n_f = n as f64;
        let mean = sorted.iter().map(|(v, c)| v * *c as f64).sum::<f64>() / n_f;
        let stdev = if n < 2 {
            0.0
        } else {
            let sum_sq: f64 = sorted
                .iter()
                .map(|(v, c)| *c as f64 * (v - mean).powi(2))
                .sum();
            (sum_sq / (n_f - 1.0)).sqrt()
        };
        let median = if n % 2 == 0 {
            (weighted_nth(&sorted, n / 2 - 1) + weighted_nth(&sorted, n / 2)) / 2.0
        } else {
            weighted_nth(&sorted, n / 2)
        };

        Self {
            sample_size: n as usize,
            min: first.0,
            max: last.0,
            mean,
            median,
            stdev,
        }
    }

    /// Mean of the sum of `scale` independent drops
    pub fn scaled_mean(&self, scale: u32) -> f64 {
        f64::from(scale) * self.mean
    }

    /// Standard deviation of the sum of `scale` independent drops
    pub fn scaled_stdev(&self, scale: u32) -> f64 {
        f64::from(scale).sqrt() * self.stdev
    }

    /// 0 when the scaled mean is 0
    pub fn coefficient_of_variation(&self, scale: u32) -> f64 {
        let m = self.scaled_mean(scale);
        if m == 0.0 {
            return 0.0;
        }
        self.scaled_stdev(scale) / m
    }

    /// Half-width of the Student-t interval on the scaled mean
    pub fn mean_error(&self, scale: u32, alpha: f64) -> StatsResult<f64> {
        if self.sample_size < 2 {
            return Ok(0.0);
        }
        let t = StudentsT::new(0.0, 1.0, (self.sample_size - 1) as f64)
            .map_err(|e| StatsError::Distribution(e.to_string()))?;
        Ok(self.scaled_stdev(scale) * t.inverse_cdf(1.0 - alpha / 2.0))
    }
}

/// Value at 0-based `rank` of the expanded series; `sorted` is ascending
fn weighted_nth(sorted: &[(f64, u64)], rank: u64) -> f64 {
    let mut seen = 0;
    for &(value, count) in sorted {
        seen += count;
        if rank < seen {
            return value;
        }
    }
    sorted.last().map_or(0.0, |p| p.0)
}

/// Exact binomial interval for `x` successes in `n` trials
pub fn clopper_pearson(x: u64, n: u64, alpha: f64) -> StatsResult<(f64, f64)> {
    if x > n {
        return Err(StatsError::InvalidInput(format!(
            "{x} successes in {n} trials"
        )));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::InvalidInput(format!("significance {alpha}")));
    }
    if n == 0 {
        return Ok((0.0, 0.0));
    }

    let tail = alpha / 2.0;
    let n_f = n as f64;
    if x == 0 {
        return Ok((0.0, 1.0 - tail.powf(1.0 / n_f)));
    }
    if x == n {
        return Ok((tail.powf(1.0 / n_f), 1.0));
    }

    let x_f = x as f64;
    let lower = Beta::new(x_f, n_f - x_f + 1.0)
        .map_err(|e| StatsError::Distribution(e.to_string()))?
        .inverse_cdf(tail);
    let upper = Beta::new(x_f + 1.0, n_f - x_f)
        .map_err(|e| StatsError::Distribution(e.to_string()))?
        .inverse_cdf(1.0 - tail);
    Ok((lower, upper))
}

/// Chance of `trials` attempts in a row without an item of drop rate `rate`
pub fn dry_chance(rate: f64, trials: u32) -> f64 {
    (1.0 - rate.clamp(0.0, 1.0)).powi(trials as i32)
}

/// `p`-th percentile of an ascending slice with linear interpolation
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Percentile interval of the sum of `draws` values resampled from `series`
pub fn bootstrap_sum_interval<R: Rng>(
    series: &[f64],
    draws: u32,
    rounds: usize,
    alpha: f64,
    rng: &mut R,
) -> (f64, f64) {
    if series.is_empty() {
        return (0.0, 0.0);
    }
    bootstrap_sum_interval_with(draws, rounds, alpha, rng, |rng| {
        series[rng.gen_range(0..series.len())]
    })
}

/// Percentile interval of the sum of `draws` values produced by `resample`
pub fn bootstrap_sum_interval_with<R, F>(
    draws: u32,
    rounds: usize,
    alpha: f64,
    rng: &mut R,
    mut resample: F,
) -> (f64, f64)
where
    R: Rng,
    F: FnMut(&mut R) -> f64,
{
    if rounds == 0 {
        return (0.0, 0.0);
    }

    let mut sums: Vec<f64> = (0..rounds)
        .map(|_| (0..draws).map(|_| resample(&mut *rng)).sum::<f64>())
        .collect();
    sums.sort_by(f64::total_cmp);

    (
        percentile(&sums, alpha / 2.0),
        percentile(&sums, 1.0 - alpha / 2.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_empty_series_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(sample_stdev(&[]), 0.0);
        assert_eq!(sample_stdev(&[5.0]), 0.0);
        assert_eq!(ResultStatistics::from_series(&[]), ResultStatistics::default());
    }

    #[test]
    fn test_basic_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(median(&values), 4.5);
        assert!(close(sample_stdev(&values), (32.0f64 / 7.0).sqrt(), 1e-12));
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_scaling() {
        let stats = ResultStatistics {
            sample_size: 10,
            min: 0.0,
            max: 2000.0,
            mean: 1000.0,
            median: 1000.0,
            stdev: 500.0,
        };
        assert_eq!(stats.scaled_mean(15), 15000.0);
        assert_eq!(stats.scaled_stdev(15), 500.0 * 15f64.sqrt());
        assert!(close(stats.scaled_stdev(15), 1936.49, 0.01));
        assert!(close(stats.coefficient_of_variation(15), 1936.49 / 15000.0, 1e-6));
    }

    #[test]
    fn test_mean_error() {
        let stats = ResultStatistics::from_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        // t(4, 0.975) = 2.776
        let expected = stats.stdev * 2.776;
        assert!(close(stats.mean_error(1, 0.05).unwrap(), expected, 1e-2));
        assert_eq!(ResultStatistics::from_series(&[1.0]).mean_error(15, 0.05).unwrap(), 0.0);
    }

    #[test]
    fn test_weighted_matches_expanded() {
        let pairs = [(300.0, 2), (0.5, 3), (1_000.0, 1), (42.0, 0)];
        let expanded = [300.0, 300.0, 0.5, 0.5, 0.5, 1_000.0];

        let weighted = ResultStatistics::from_weighted(&pairs);
        let direct = ResultStatistics::from_series(&expanded);
        assert_eq!(weighted.sample_size, 6);
        assert_eq!(weighted.min, direct.min);
        assert_eq!(weighted.max, direct.max);
        assert_eq!(weighted.median, direct.median);
        assert!(close(weighted.mean, direct.mean, 1e-9));
        assert!(close(weighted.stdev, direct.stdev, 1e-9));

        assert_eq!(ResultStatistics::from_weighted(&[(5.0, 3)]).median, 5.0);
        assert_eq!(ResultStatistics::from_weighted(&[]), ResultStatistics::default());
    }

    #[test]
    fn test_min_max() {
        let stats = ResultStatistics::from_series(&[3.0, -1.0, 8.0]);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 8.0);
        assert_eq!(stats.sample_size, 3);
    }

    #[test]
    fn test_clopper_pearson_boundaries() {
        let (lower, upper) = clopper_pearson(0, 10, 0.05).unwrap();
        assert_eq!(lower, 0.0);
        assert!(close(upper, 1.0 - 0.025f64.powf(0.1), 1e-12));
        assert!(close(upper, 0.3085, 1e-4));

        let (lower, upper) = clopper_pearson(10, 10, 0.05).unwrap();
        assert_eq!(upper, 1.0);
        assert!(close(lower, 0.6915, 1e-4));

        assert_eq!(clopper_pearson(0, 0, 0.05).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn test_clopper_pearson_interior() {
        let (lower, upper) = clopper_pearson(5, 10, 0.05).unwrap();
        assert!(close(lower, 0.1871, 1e-3));
        assert!(close(upper, 0.8129, 1e-3));
    }

    #[test]
    fn test_clopper_pearson_rejects_bad_input() {
        assert!(clopper_pearson(11, 10, 0.05).is_err());
        assert!(clopper_pearson(1, 10, 0.0).is_err());
    }

    #[test]
    fn test_dry_chance() {
        assert_eq!(dry_chance(0.0, 100), 1.0);
        assert_eq!(dry_chance(1.0, 1), 0.0);
        assert!(close(dry_chance(0.1, 2), 0.81, 1e-12));
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 1.0), 4.0);
        assert_eq!(percentile(&sorted, 0.5), 2.5);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_bootstrap_interval() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(bootstrap_sum_interval(&[], 15, 100, 0.05, &mut rng), (0.0, 0.0));

        let constant = [10.0; 20];
        assert_eq!(
            bootstrap_sum_interval(&constant, 15, 500, 0.05, &mut rng),
            (150.0, 150.0)
        );

        let series = [0.0, 100.0];
        let (lower, upper) = bootstrap_sum_interval(&series, 15, 5_000, 0.05, &mut rng);
        assert!(lower < 750.0 && 750.0 < upper);
        assert!(lower >= 0.0 && upper <= 1500.0);
    }
}
