use crate::error::{Result, RspError};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

/// How foreground and background curves are scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RspMode {
    /// Each curve is the fraction of its own population inside the scanning window
    #[default]
    Relative,
    /// Curves are raw counts, and every foreground gets an expected curve:
    /// the count it would have if it were a uniform sample of the background
    Absolute,
}

/// RSP curve configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RspConfig {
    /// Number of angles on the shared grid over `[0, 2π)`
    pub resolution: usize,

    /// Full angular width of the scanning window, in radians
    pub scanning_window: f64,

    /// Curve scaling
    pub mode: RspMode,
}

impl Default for RspConfig {
    fn default() -> Self {
        Self {
            resolution: 360,
            scanning_window: FRAC_PI_2,
            mode: RspMode::Relative,
        }
    }
}

impl RspConfig {
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(RspError::ConfigError(
                "resolution must be at least 1".to_string(),
            ));
        }
        if !self.scanning_window.is_finite()
            || self.scanning_window <= 0.0
            || self.scanning_window > TAU
        {
            return Err(RspError::ConfigError(format!(
                "scanning window must be in (0, 2π], got {}",
                self.scanning_window
            )));
        }
        Ok(())
    }

    /// Angle grid for this configuration
    pub fn grid(&self) -> Vec<f64> {
        angle_grid(self.resolution)
    }
}

/// `resolution` evenly spaced angles over `[0, 2π)`, endpoint excluded
pub fn angle_grid(resolution: usize) -> Vec<f64> {
    let step = TAU / resolution as f64;
    (0..resolution).map(|i| i as f64 * step).collect()
}
