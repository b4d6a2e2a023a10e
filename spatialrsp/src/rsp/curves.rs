use super::config::{RspConfig, RspMode};
use crate::error::{Result, RspError};
use crate::stats::rmsd::{compute_rmsd, coverage};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Angles of one population, sorted once so each window count is two binary searches
#[derive(Debug, Clone)]
pub struct SectorCounter {
    sorted: Vec<f64>,
}

impl SectorCounter {
    /// Build a counter from angles in radians; values outside `[0, 2π)` are wrapped
    pub fn new(angles: &[f64]) -> Result<Self> {
        if let Some(index) = angles.iter().position(|a| !a.is_finite()) {
            return Err(RspError::DataError(format!(
                "angle at index {} is not finite: {}",
                index, angles[index]
            )));
        }
        let mut sorted: Vec<f64> = angles
            .iter()
            .map(|a| {
                let wrapped = a.rem_euclid(TAU);
                if wrapped >= TAU { 0.0 } else { wrapped }
            })
            .collect();
        sorted.sort_by(f64::total_cmp);
        Ok(Self { sorted })
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Number of angles in the closed interval `[lo, hi]`
    fn count_between(&self, lo: f64, hi: f64) -> usize {
        let upper = self.sorted.partition_point(|&a| a <= hi);
        let lower = self.sorted.partition_point(|&a| a < lo);
        upper.saturating_sub(lower)
    }

    /// Number of angles whose circular distance from `center` is at most `half_width`
    pub fn count(&self, center: f64, half_width: f64) -> usize {
        if half_width >= PI {
            return self.sorted.len();
        }
        let lo = center - half_width;
        let hi = center + half_width;
        if lo < 0.0 {
            self.count_between(0.0, hi) + self.count_between(lo + TAU, TAU)
        } else if hi >= TAU {
            self.count_between(lo, TAU) + self.count_between(0.0, hi - TAU)
        } else {
            self.count_between(lo, hi)
        }
    }

    /// Window count at every grid angle
    pub fn counts(&self, grid: &[f64], window: f64) -> Vec<usize> {
        let half_width = window / 2.0;
        grid.iter().map(|&theta| self.count(theta, half_width)).collect()
    }
}

/// RSP curve of a single foreground population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForegroundCurve {
    pub label: String,
    pub n_points: usize,
    pub curve: Vec<f64>,
    /// Background-proportional expectation; only present in absolute mode
    pub expected: Option<Vec<f64>>,
}

impl ForegroundCurve {
    /// Curve this foreground is judged against: its expectation in absolute mode,
    /// the background fractions in relative mode
    pub fn reference<'a>(&'a self, background: &'a [f64]) -> &'a [f64] {
        self.expected.as_deref().unwrap_or(background)
    }
}

/// Background and foreground curves on a shared angle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RspCurves {
    pub mode: RspMode,
    pub scanning_window: f64,
    pub angles: Vec<f64>,
    pub n_background: usize,
    pub background: Vec<f64>,
    pub foregrounds: Vec<ForegroundCurve>,
}

impl RspCurves {
    pub fn resolution(&self) -> usize {
        self.angles.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.foregrounds.iter().map(|f| f.label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<&ForegroundCurve> {
        self.foregrounds.iter().find(|f| f.label == label)
    }

    /// RMSD of each foreground curve against the background curve, in foreground order
    pub fn rmsd_against_background(&self) -> Result<Vec<(String, f64)>> {
        self.foregrounds
            .iter()
            .map(|fg| compute_rmsd(&fg.curve, &self.background).map(|v| (fg.label.clone(), v)))
            .collect()
    }

    /// RMSD of each foreground curve against its reference (see [`ForegroundCurve::reference`])
    pub fn rmsd_against_expected(&self) -> Result<Vec<(String, f64)>> {
        self.foregrounds
            .iter()
            .map(|fg| {
                compute_rmsd(&fg.curve, fg.reference(&self.background))
                    .map(|value| (fg.label.clone(), value))
            })
            .collect()
    }

    /// Fraction of the grid where each foreground lies above its reference
    pub fn coverage(&self) -> Result<Vec<(String, f64)>> {
        self.foregrounds
            .iter()
            .map(|fg| {
                coverage(&fg.curve, fg.reference(&self.background))
                    .map(|value| (fg.label.clone(), value))
            })
            .collect()
    }

    /// Largest value over every curve, for scaling plots
    pub fn max_value(&self) -> f64 {
        self.foregrounds
            .iter()
            .flat_map(|fg| fg.curve.iter().chain(fg.expected.iter().flatten()))
            .chain(self.background.iter())
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Compute RSP curves for a background and any number of labelled foregrounds
///
/// At each grid angle `θ`, a population's window count is the number of its angles
/// within circular distance `scanning_window / 2` of `θ`.
///
/// * [`RspMode::Relative`]: every curve is its window count divided by its own size,
///   so background and foregrounds are directly comparable fractions.
/// * [`RspMode::Absolute`]: curves are raw counts, and each foreground carries
///   `expected(θ) = background_count(θ) / n_background * n_foreground`.
///
/// # Errors
/// * [`RspError::ConfigError`] for an invalid configuration
/// * [`RspError::EmptyInput`] if the background or any foreground is empty
/// * [`RspError::DataError`] if any angle is not finite
pub fn compute_rsp<S, A>(
    background: &[f64],
    foregrounds: &[(S, A)],
    config: &RspConfig,
) -> Result<RspCurves>
where
    S: AsRef<str>,
    A: AsRef<[f64]>,
{
    config.validate()?;
    if background.is_empty() {
        return Err(RspError::empty("background has no points"));
    }

    let grid = config.grid();
    let bg_counter = SectorCounter::new(background)?;
    let bg_counts = bg_counter.counts(&grid, config.scanning_window);
    let n_bg = bg_counter.len() as f64;

    let background_curve: Vec<f64> = match config.mode {
        RspMode::Relative => bg_counts.iter().map(|&c| c as f64 / n_bg).collect(),
        RspMode::Absolute => bg_counts.iter().map(|&c| c as f64).collect(),
    };

    let mut curves = Vec::with_capacity(foregrounds.len());
    for (label, angles) in foregrounds {
        let label = label.as_ref();
        let angles = angles.as_ref();
        if angles.is_empty() {
            return Err(RspError::empty(format!("foreground '{}' has no points", label)));
        }

        let counter = SectorCounter::new(angles)?;
        let counts = counter.counts(&grid, config.scanning_window);
        let n_fg = counter.len() as f64;

        let (curve, expected) = match config.mode {
            RspMode::Relative => (counts.iter().map(|&c| c as f64 / n_fg).collect(), None),
            RspMode::Absolute => {
                let expected = bg_counts.iter().map(|&c| c as f64 / n_bg * n_fg).collect();
                (counts.iter().map(|&c| c as f64).collect(), Some(expected))
            }
        };

        tracing::debug!(
            "RSP foreground '{}': {} points, peak window count {}",
            label,
            counter.len(),
            counts.iter().max().copied().unwrap_or(0)
        );

        curves.push(ForegroundCurve {
            label: label.to_string(),
            n_points: counter.len(),
            curve,
            expected,
        });
    }

    Ok(RspCurves {
        mode: config.mode,
        scanning_window: config.scanning_window,
        angles: grid,
        n_background: bg_counter.len(),
        background: background_curve,
        foregrounds: curves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::wrapped_difference;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn brute_force(angles: &[f64], center: f64, half_width: f64) -> usize {
        angles
            .iter()
            .filter(|&&a| wrapped_difference(a, center).abs() <= half_width)
            .count()
    }

    #[test]
    fn test_sector_count_matches_brute_force() {
        let angles: Vec<f64> = (0..97).map(|i| (i as f64 * 0.37).rem_euclid(TAU)).collect();
        let counter = SectorCounter::new(&angles).unwrap();
        for center in [0.0, 0.05, 1.0, PI, 5.0, TAU - 0.01] {
            for half_width in [0.01, 0.3, FRAC_PI_2, 3.0] {
                assert_eq!(
                    counter.count(center, half_width),
                    brute_force(&angles, center, half_width),
                    "center {} half width {}",
                    center,
                    half_width
                );
            }
        }
    }

    #[test]
    fn test_window_wraps_across_zero() {
        let counter = SectorCounter::new(&[0.1, TAU - 0.1, PI]).unwrap();
        assert_eq!(counter.count(0.0, 0.2), 2);
        assert_eq!(counter.count(TAU - 0.05, 0.2), 2);
    }

    #[test]
    fn test_full_window_covers_everything() {
        let counter = SectorCounter::new(&[0.0, 1.0, 2.0, 4.0]).unwrap();
        assert_eq!(counter.count(0.3, PI), 4);
    }

    #[test]
    fn test_relative_curves_are_fractions() {
        let background: Vec<f64> = (0..8).map(|i| i as f64 * TAU / 8.0 + 0.05).collect();
        let foreground = vec![0.0, 0.1];
        let config = RspConfig {
            resolution: 4,
            scanning_window: FRAC_PI_2,
            mode: RspMode::Relative,
        };

        let curves = compute_rsp(&background, &[("a", foreground)], &config).unwrap();
        assert_eq!(curves.resolution(), 4);
        // window at 0 covers 0.05 and 7π/4 + 0.05
        assert_relative_eq!(curves.background[0], 2.0 / 8.0);
        assert_relative_eq!(curves.foregrounds[0].curve[0], 1.0);
        assert_relative_eq!(curves.foregrounds[0].curve[2], 0.0);
        assert!(curves.foregrounds[0].expected.is_none());
    }

    #[test]
    fn test_absolute_mode_expected_curve() {
        let background: Vec<f64> = (0..8).map(|i| i as f64 * TAU / 8.0 + 0.05).collect();
        let config = RspConfig {
            resolution: 4,
            mode: RspMode::Absolute,
            ..Default::default()
        };

        let curves = compute_rsp(&background, &[("a", vec![0.0, 0.1])], &config).unwrap();
        let fg = &curves.foregrounds[0];
        assert_relative_eq!(curves.background[0], 2.0);
        assert_relative_eq!(fg.curve[0], 2.0);
        let expected = fg.expected.as_ref().unwrap();
        assert_relative_eq!(expected[0], 2.0 / 8.0 * 2.0);
        assert_eq!(fg.reference(&curves.background), expected.as_slice());
    }

    #[test]
    fn test_foreground_equal_to_background_has_zero_rmsd() {
        let background: Vec<f64> = (0..50).map(|i| (i as f64 * 1.3).rem_euclid(TAU)).collect();
        let curves = compute_rsp(
            &background,
            &[("same", background.clone())],
            &RspConfig::default(),
        )
        .unwrap();
        let rmsd = curves.rmsd_against_expected().unwrap();
        assert_eq!(rmsd[0].0, "same");
        assert_relative_eq!(rmsd[0].1, 0.0);
        assert_eq!(curves.rmsd_against_background().unwrap(), rmsd);
        assert_relative_eq!(curves.coverage().unwrap()[0].1, 0.0);
    }

    #[test]
    fn test_empty_populations_are_rejected() {
        let config = RspConfig::default();
        let none: [(&str, Vec<f64>); 0] = [];
        assert!(matches!(
            compute_rsp(&[], &none, &config).unwrap_err(),
            RspError::EmptyInput(_)
        ));
        assert!(matches!(
            compute_rsp(&[0.0], &[("empty", Vec::new())], &config).unwrap_err(),
            RspError::EmptyInput(_)
        ));
    }

    #[test]
    fn test_non_finite_angle_is_rejected() {
        let err = SectorCounter::new(&[0.0, f64::INFINITY]).unwrap_err();
        assert!(matches!(err, RspError::DataError(_)));
    }
}
