//! Radial spatial profile (RSP) curves
//!
//! A population's RSP curve records, for every angle on a shared grid, how many of
//! its points fall inside a circular scanning window centred on that angle.
//! Comparing a foreground curve with the background curve shows the directions in
//! which the foreground is over- or under-represented around the vantage point.

pub mod config;
pub mod curves;

pub use config::{RspConfig, RspMode, angle_grid};
pub use curves::{ForegroundCurve, RspCurves, SectorCounter, compute_rsp};
