//! Per-angle enrichment tests
//!
//! At each grid angle the foreground window count `k` out of `n` foreground points is
//! tested against `Binomial(n, p)` with `p = c_bg(θ) / n_bg`, the fraction of the
//! background inside the same window. The resulting p-values go through
//! Benjamini-Hochberg correction across the grid.

use crate::error::{Result, RspError};
use crate::rsp::{RspConfig, SectorCounter};
use crate::stats::fdr::{FdrResult, correct};
use statrs::distribution::{Binomial, Discrete, DiscreteCDF};

const RELATIVE_TOLERANCE: f64 = 1.0 + 1e-7;

/// Two-sided exact binomial test
///
/// Sums the probability of every outcome no more likely than `k`, using a relative
/// tolerance of `1e-7` when comparing probabilities. The probability mass is
/// unimodal, so the opposite tail is found by binary search rather than a full scan.
pub fn binomial_two_sided(k: u64, n: u64, p: f64) -> Result<f64> {
    if k > n {
        return Err(RspError::StatsError(format!(
            "observed count {} exceeds number of trials {}",
            k, n
        )));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(RspError::StatsError(format!(
            "success probability {} is outside [0, 1]",
            p
        )));
    }
    if p == 0.0 {
        return Ok(if k == 0 { 1.0 } else { 0.0 });
    }
    if p == 1.0 {
        return Ok(if k == n { 1.0 } else { 0.0 });
    }

    let dist = Binomial::new(p, n)
        .map_err(|e| RspError::StatsError(format!("Invalid binomial parameters: {}", e)))?;
    let threshold = dist.pmf(k) * RELATIVE_TOLERANCE;
    let mean = p * n as f64;
    let k_f64 = k as f64;

    let pvalue = if k_f64 == mean {
        1.0
    } else if k_f64 < mean {
        // pmf is non-increasing on [ceil(mean), n]
        let start = mean.ceil() as u64;
        let first = partition_point_u64(start, n + 1, |i| dist.pmf(i) > threshold);
        let upper_tail = if first > n { 0.0 } else { dist.sf(first - 1) };
        dist.cdf(k) + upper_tail
    } else {
        // pmf is non-decreasing on [0, floor(mean)]
        let end = mean.floor() as u64;
        let past = partition_point_u64(0, end + 1, |i| dist.pmf(i) <= threshold);
        let lower_tail = if past == 0 { 0.0 } else { dist.cdf(past - 1) };
        lower_tail + dist.sf(k - 1)
    };

    Ok(pvalue.min(1.0))
}

/// First `i` in `[lo, hi)` where `pred` turns false, assuming it is true then false
fn partition_point_u64(mut lo: u64, mut hi: u64, pred: impl Fn(u64) -> bool) -> u64 {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Raw per-angle p-values of the foreground against the background
///
/// # Errors
/// * [`RspError::ConfigError`] for an invalid configuration
/// * [`RspError::EmptyInput`] if either population is empty
pub fn angular_pvalues(
    background: &[f64],
    foreground: &[f64],
    config: &RspConfig,
) -> Result<Vec<f64>> {
    config.validate()?;
    if background.is_empty() {
        return Err(RspError::empty("background has no points"));
    }
    if foreground.is_empty() {
        return Err(RspError::empty("foreground has no points"));
    }

    let grid = config.grid();
    let bg_counts = SectorCounter::new(background)?.counts(&grid, config.scanning_window);
    let fg_counts = SectorCounter::new(foreground)?.counts(&grid, config.scanning_window);
    let n_bg = background.len() as f64;
    let n_fg = foreground.len() as u64;

    bg_counts
        .iter()
        .zip(&fg_counts)
        .map(|(&bg, &fg)| binomial_two_sided(fg as u64, n_fg, bg as f64 / n_bg))
        .collect()
}

/// Per-angle p-values with Benjamini-Hochberg q-values across the grid
pub fn angular_significance(
    background: &[f64],
    foreground: &[f64],
    config: &RspConfig,
) -> Result<FdrResult> {
    let pvalues = angular_pvalues(background, foreground, config)?;
    let result = correct(&pvalues)?;
    let min_q = result.q_values.iter().copied().fold(f64::INFINITY, f64::min);
    tracing::debug!(
        "angular significance: {} angles, smallest q {:.3e}",
        result.n_tests(),
        min_q
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    #[test]
    fn test_symmetric_binomial() {
        // n = 10, p = 0.5, k = 2: P(X <= 2) + P(X >= 8) = 2 * 56 / 1024
        let p = binomial_two_sided(2, 10, 0.5).unwrap();
        assert_relative_eq!(p, 112.0 / 1024.0, epsilon = 1e-12);

        let p = binomial_two_sided(8, 10, 0.5).unwrap();
        assert_relative_eq!(p, 112.0 / 1024.0, epsilon = 1e-12);
    }

    #[test]
    fn test_observed_at_mean_is_one() {
        assert_eq!(binomial_two_sided(5, 10, 0.5).unwrap(), 1.0);
        assert_eq!(binomial_two_sided(3, 12, 0.25).unwrap(), 1.0);
    }

    #[test]
    fn test_asymmetric_binomial_matches_full_sum() {
        let (n, p) = (20u64, 0.3);
        let dist = Binomial::new(p, n).unwrap();
        for k in 0..=n {
            let d = dist.pmf(k) * RELATIVE_TOLERANCE;
            let brute: f64 = (0..=n).map(|i| dist.pmf(i)).filter(|&q| q <= d).sum();
            let fast = binomial_two_sided(k, n, p).unwrap();
            assert_relative_eq!(fast, brute.min(1.0), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_degenerate_probabilities() {
        assert_eq!(binomial_two_sided(0, 5, 0.0).unwrap(), 1.0);
        assert_eq!(binomial_two_sided(1, 5, 0.0).unwrap(), 0.0);
        assert_eq!(binomial_two_sided(5, 5, 1.0).unwrap(), 1.0);
        assert_eq!(binomial_two_sided(4, 5, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(binomial_two_sided(6, 5, 0.5).is_err());
        assert!(binomial_two_sided(1, 5, 1.5).is_err());
        assert!(binomial_two_sided(1, 5, f64::NAN).is_err());
    }

    #[test]
    fn test_concentrated_foreground_is_significant() {
        let background: Vec<f64> = (0..400).map(|i| i as f64 * TAU / 400.0).collect();
        let foreground: Vec<f64> = (0..60).map(|i| 0.5 + i as f64 * 0.005).collect();
        let config = RspConfig {
            resolution: 36,
            ..Default::default()
        };

        let result = angular_significance(&background, &foreground, &config).unwrap();
        assert_eq!(result.n_tests(), 36);
        // grid angle 30° (index 3) sits on top of the foreground cluster
        assert!(result.q_values[3] < 1e-6);
        assert!(result.q_values.iter().all(|&q| (0.0..=1.0).contains(&q)));
    }

    #[test]
    fn test_significance_threshold_is_chosen_by_caller() {
        let background: Vec<f64> = (0..400).map(|i| i as f64 * TAU / 400.0).collect();
        let foreground: Vec<f64> = (0..60).map(|i| 0.5 + i as f64 * 0.005).collect();
        let config = RspConfig {
            resolution: 36,
            ..Default::default()
        };

        let result = angular_significance(&background, &foreground, &config).unwrap();
        let strict = result.n_significant(1e-12);
        let loose = result.n_significant(0.2);
        assert!(strict <= result.n_significant(0.05));
        assert!(result.n_significant(0.05) <= loose);
        assert!(loose > 0);
        assert_eq!(result.n_significant(1.01), result.n_tests());
    }

    #[test]
    fn test_uniform_subsample_is_not_significant() {
        let background: Vec<f64> = (0..720).map(|i| i as f64 * TAU / 720.0).collect();
        let foreground: Vec<f64> = background.iter().step_by(4).copied().collect();
        let config = RspConfig {
            resolution: 24,
            ..Default::default()
        };

        let result = angular_significance(&background, &foreground, &config).unwrap();
        assert_eq!(result.n_significant(0.05), 0);
    }

    #[test]
    fn test_empty_foreground() {
        let err = angular_pvalues(&[0.0, 1.0], &[], &RspConfig::default()).unwrap_err();
        assert!(matches!(err, RspError::EmptyInput(_)));
    }
}
