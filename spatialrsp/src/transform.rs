//! Cartesian to polar conversion around a vantage point
//!
//! Angles are reported in radians in `[0, 2π)`, measured counter-clockwise
//! from the positive x axis. Every consumer in this crate (the RSP angle grid,
//! per-angle significance, the polar plots) uses this same convention.
//!
//! A point that coincides with the vantage point has radius `0.0` and angle `0.0`.

use crate::error::{Result, RspError};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Angles and radii of a point set, aligned with the input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarCoords {
    /// Angle of each point in radians, in `[0, 2π)`
    pub angles: Vec<f64>,
    /// Euclidean distance of each point from the vantage point
    pub radii: Vec<f64>,
}

impl PolarCoords {
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

/// Normalize an `atan2` result into `[0, 2π)`
///
/// Negative angles are shifted by a full turn. A tiny negative angle can round to
/// exactly `2π` after the shift, so that case folds back to `0.0`.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let shifted = if angle < 0.0 { angle + TAU } else { angle + 0.0 };
    if shifted >= TAU { 0.0 } else { shifted }
}

/// Signed smallest difference `a - b`, wrapped into `[-π, π)`
#[inline]
pub fn wrapped_difference(a: f64, b: f64) -> f64 {
    (a - b + std::f64::consts::PI).rem_euclid(TAU) - std::f64::consts::PI
}

/// Angle and radius of a single displacement
#[inline]
fn polar_of(dx: f64, dy: f64) -> (f64, f64) {
    let radius = dx.hypot(dy);
    if radius == 0.0 {
        return (0.0, 0.0);
    }
    (normalize_angle(dy.atan2(dx)), radius)
}

/// Convert an `n x 2` coordinate matrix to polar coordinates around `vantage`
///
/// # Arguments
/// * `points` - Coordinates, one row per point; must have exactly 2 columns
/// * `vantage` - Vantage point; must have exactly 2 values
///
/// # Errors
/// * [`RspError::EmptyInput`] if `points` has no rows
/// * [`RspError::DimensionMismatch`] if `points` is not 2-column or `vantage` is not 2D
/// * [`RspError::InvalidCoordinate`] if any point is not finite
/// * [`RspError::ConfigError`] if the vantage point is not finite
///
/// Shape checks run before any computation.
pub fn cartesian_to_polar(points: ArrayView2<'_, f64>, vantage: &[f64]) -> Result<PolarCoords> {
    if vantage.len() != 2 {
        return Err(RspError::dimension("vantage point", 2, vantage.len()));
    }
    if points.ncols() != 2 {
        return Err(RspError::dimension("point set columns", 2, points.ncols()));
    }
    if points.nrows() == 0 {
        return Err(RspError::empty("point set has no rows"));
    }

    let (vx, vy) = (vantage[0], vantage[1]);
    if !vx.is_finite() || !vy.is_finite() {
        return Err(RspError::ConfigError(format!(
            "Vantage point ({}, {}) is not finite",
            vx, vy
        )));
    }

    let mut angles = Vec::with_capacity(points.nrows());
    let mut radii = Vec::with_capacity(points.nrows());
    for (index, row) in points.outer_iter().enumerate() {
        let (x, y) = (row[0], row[1]);
        if !x.is_finite() || !y.is_finite() {
            return Err(RspError::InvalidCoordinate { index, x, y });
        }
        let (angle, radius) = polar_of(x - vx, y - vy);
        angles.push(angle);
        radii.push(radius);
    }

    Ok(PolarCoords { angles, radii })
}

/// Convert a slice of 2D points to polar coordinates around `vantage`
///
/// Same contract as [`cartesian_to_polar`]; the dimensionality is fixed by the type.
pub fn polar_from_points(points: &[[f64; 2]], vantage: [f64; 2]) -> Result<PolarCoords> {
    if points.is_empty() {
        return Err(RspError::empty("point set has no rows"));
    }
    let view = ArrayView2::from_shape((points.len(), 2), points.as_flattened())
        .map_err(|e| RspError::StatsError(format!("Failed to view point set: {}", e)))?;
    cartesian_to_polar(view, &vantage)
}

/// Angles only, for callers that discard the radii
pub fn angles_from_points(points: &[[f64; 2]], vantage: [f64; 2]) -> Result<Vec<f64>> {
    polar_from_points(points, vantage).map(|polar| polar.angles)
}
