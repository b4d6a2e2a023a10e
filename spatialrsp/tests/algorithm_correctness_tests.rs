//! Algorithm correctness tests
//!
//! These tests check the statistics against values worked out by hand and against
//! properties that must hold for any input.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatialrsp::{
    RspConfig, RspMode, angle_grid, angles_from_points, bh_fdr, compute_rsp, polar_from_points,
};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Uniformly spaced angles give flat relative curves equal to window / 2π
#[test]
fn test_uniform_angles_give_flat_curve() {
    let n = 3600;
    let angles: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5) * TAU / n as f64).collect();
    let config = RspConfig {
        resolution: 72,
        scanning_window: FRAC_PI_2,
        mode: RspMode::Relative,
    };

    let curves = compute_rsp(&angles, &[("all", angles.clone())], &config).unwrap();
    for value in &curves.background {
        assert_relative_eq!(*value, 0.25, epsilon = 1.0 / n as f64);
    }
}

/// Sum over the grid of an absolute-mode expected curve equals the foreground's own sum
/// when the foreground is spread like the background
#[test]
fn test_expected_curve_scales_background() {
    let background: Vec<f64> = (0..1000).map(|i| i as f64 * TAU / 1000.0).collect();
    let foreground: Vec<f64> = background.iter().step_by(10).copied().collect();
    let config = RspConfig {
        resolution: 100,
        mode: RspMode::Absolute,
        ..Default::default()
    };

    let curves = compute_rsp(&background, &[("tenth", foreground)], &config).unwrap();
    let fg = &curves.foregrounds[0];
    let expected = fg.expected.as_ref().unwrap();

    for (e, b) in expected.iter().zip(&curves.background) {
        assert_relative_eq!(*e, b / 10.0, epsilon = 1e-12);
    }
    let observed_total: f64 = fg.curve.iter().sum();
    let expected_total: f64 = expected.iter().sum();
    assert_relative_eq!(observed_total, expected_total, max_relative = 0.02);
}

/// A foreground concentrated in one direction peaks at that direction
#[test]
fn test_curve_peaks_in_foreground_direction() {
    let mut rng = StdRng::seed_from_u64(7);
    let background: Vec<[f64; 2]> = (0..2000)
        .map(|_| [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)])
        .collect();
    let foreground: Vec<[f64; 2]> = (0..200)
        .map(|_| [rng.random_range(-0.1..0.1), rng.random_range(0.5..1.0)])
        .collect();

    let bg = angles_from_points(&background, [0.0, 0.0]).unwrap();
    let fg = angles_from_points(&foreground, [0.0, 0.0]).unwrap();
    let config = RspConfig {
        resolution: 360,
        scanning_window: PI / 6.0,
        ..Default::default()
    };
    let curves = compute_rsp(&bg, &[("north", fg)], &config).unwrap();

    let curve = &curves.foregrounds[0].curve;
    let peak = curve
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| curves.angles[i])
        .unwrap();
    assert!((peak - FRAC_PI_2).abs() < 0.2, "peak at {}", peak);

    let rmsd = curves.rmsd_against_expected().unwrap();
    assert!(rmsd[0].1 > 0.1);
}

#[test]
fn test_transform_reference_example() {
    let polar = polar_from_points(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]], [0.0, 0.0]).unwrap();
    assert_relative_eq!(polar.angles[0], 0.0);
    assert_relative_eq!(polar.angles[1], FRAC_PI_2);
    assert_relative_eq!(polar.angles[2], PI);
    assert!(polar.radii.iter().all(|&r| (r - 1.0).abs() < 1e-12));
}

/// Radii are never negative and angles always land in [0, 2π)
#[test]
fn test_transform_ranges() {
    let mut rng = StdRng::seed_from_u64(11);
    let points: Vec<[f64; 2]> = (0..5000)
        .map(|_| [rng.random_range(-1e3..1e3), rng.random_range(-1e3..1e3)])
        .collect();
    let vantage = [rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)];

    let polar = polar_from_points(&points, vantage).unwrap();
    assert_eq!(polar.len(), points.len());
    assert!(polar.radii.iter().all(|&r| r >= 0.0));
    assert!(polar.angles.iter().all(|&a| (0.0..TAU).contains(&a)));
}

#[test]
fn test_bh_reference_values() {
    assert_eq!(bh_fdr(&[0.05]).unwrap(), vec![0.05]);

    let q = bh_fdr(&[0.01, 0.04, 0.03, 0.005]).unwrap();
    for (got, want) in q.iter().zip([0.02, 0.04, 0.04, 0.02]) {
        assert_relative_eq!(*got, want, epsilon = 1e-12);
    }

    assert_eq!(bh_fdr(&[1.0; 4]).unwrap(), vec![1.0; 4]);
    assert_eq!(bh_fdr(&[0.0; 4]).unwrap(), vec![0.0; 4]);
}

/// q never exceeds its raw p·N/k and is non-decreasing in ascending p order
#[test]
fn test_bh_monotone_and_bounded() {
    let mut rng = StdRng::seed_from_u64(3);
    let pvalues: Vec<f64> = (0..500).map(|_| rng.random::<f64>().powi(3)).collect();
    let q = bh_fdr(&pvalues).unwrap();
    let n = pvalues.len() as f64;

    let mut order: Vec<usize> = (0..pvalues.len()).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    for (rank, window) in order.windows(2).enumerate() {
        assert!(q[window[0]] <= q[window[1]], "not monotone at rank {}", rank + 1);
    }
    for (position, &index) in order.iter().enumerate() {
        let raw = pvalues[index] * n / (position + 1) as f64;
        assert!(q[index] <= raw + 1e-15);
        assert!(q[index] >= pvalues[index]);
        assert!(q[index] <= 1.0);
    }
}

#[test]
fn test_grid_spacing() {
    let grid = angle_grid(360);
    for pair in grid.windows(2) {
        assert_relative_eq!(pair[1] - pair[0], TAU / 360.0, epsilon = 1e-12);
    }
}
