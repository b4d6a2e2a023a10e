//! # rsp-plots
//!
//! Plots for radial spatial profile (RSP) analysis of single-cell embeddings.
//!
//! ## Overview
//!
//! Every plot type implements [`Plot`]: it draws onto any plotters drawing area,
//! so plots compose (see [`CompositePlot`]), and can be rendered to PNG bytes or
//! saved as PNG/SVG depending on the file extension.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use rsp_plots::{BarplotOptions, BasePlotOptions, ComparisonBarplot, Plot};
//!
//! let base = BasePlotOptions::new()
//!     .width(600u32)
//!     .height(400u32)
//!     .title("RMSD vs background")
//!     .build()?;
//! let options = BarplotOptions::new().base(base).build()?;
//! let rmsd = vec![("podocyte".to_string(), 0.12), ("tubule".to_string(), 0.04)];
//! let bytes = ComparisonBarplot::new().render(&rmsd[..], &options)?;
//! ComparisonBarplot::new().save(&rmsd[..], &options, "rmsd.svg")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - `options`: Plot configuration types using the builder pattern
//! - `plots`: Plot implementations
//! - `render`: Output formats and PNG encoding
//! - `colormap`: Continuous colour maps and the categorical palette

pub mod colormap;
pub mod options;
pub mod plots;
pub mod render;

pub use colormap::{ColorMaps, categorical_color};
pub use options::{
    AxisOptions, BarplotOptions, BasePlotOptions, BoxplotOptions, CompositePlotOptions,
    EmbeddingPlotOptions, ExpressionScatterOptions, PlotOptions, RspCurvePlotOptions,
};
pub use plots::{
    BoxStats, ComparisonBarplot, CompositeData, CompositePlot, CoverageBoxplot, EmbeddingLayers,
    EmbeddingPlot, ExpressionPoints, ExpressionScatter, Plot, RspCurvePlot,
};
pub use render::OutputFormat;

// Type aliases
pub type PlotBytes = Vec<u8>;
pub type PlotRange = std::ops::RangeInclusive<f64>;

/// Round a data range outwards to "nice" bounds for axis display
pub fn nice_bounds(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let range = max - min;
    if range <= 0.0 {
        return (min - 0.5, min + 0.5);
    }

    let step_size = 10_f64.powf(range.log10().floor());
    let nice_min = (min / step_size).floor() * step_size;
    let nice_max = (max / step_size).ceil() * step_size;

    (nice_min, nice_max)
}

/// Square window around `center` wide enough for the larger span of `points`
///
/// The half side is half the larger of the x and y spans; degenerate inputs
/// (no points, or every point identical) get a half side of 1.
pub fn square_window<'a>(
    points: impl IntoIterator<Item = &'a [f64; 2]>,
    center: Option<[f64; 2]>,
) -> (PlotRange, PlotRange) {
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for &[x, y] in points {
        if x.is_finite() && y.is_finite() {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_x > max_x {
        let [cx, cy] = center.unwrap_or([0.0, 0.0]);
        return ((cx - 1.0)..=(cx + 1.0), (cy - 1.0)..=(cy + 1.0));
    }

    let [cx, cy] = center.unwrap_or([(min_x + max_x) / 2.0, (min_y + max_y) / 2.0]);
    let half = match (max_x - min_x).max(max_y - min_y) / 2.0 {
        h if h > 0.0 => h,
        _ => 1.0,
    };
    ((cx - half)..=(cx + half), (cy - half)..=(cy + half))
}
