pub mod axis;
pub mod base;
pub mod composite;
pub mod embedding;
pub mod expression;
pub mod rsp_curve;
pub mod summary;

pub use axis::{AxisOptions, AxisOptionsBuilder};
pub use base::{BasePlotOptions, BasePlotOptionsBuilder};
pub use composite::{CompositePlotOptions, CompositePlotOptionsBuilder};
pub use embedding::{EmbeddingPlotOptions, EmbeddingPlotOptionsBuilder};
pub use expression::{ExpressionScatterOptions, ExpressionScatterOptionsBuilder};
pub use rsp_curve::{RspCurvePlotOptions, RspCurvePlotOptionsBuilder};
pub use summary::{BarplotOptions, BarplotOptionsBuilder, BoxplotOptions, BoxplotOptionsBuilder};

/// Trait for plot options types
///
/// All plot-specific options structs should implement this trait to provide
/// access to the base options.
pub trait PlotOptions {
    /// Get a reference to the base plot options
    fn base(&self) -> &BasePlotOptions;
}
