pub mod composite;
pub mod embedding;
pub mod expression;
pub mod rsp_curve;
pub mod summary;
pub mod traits;

pub use composite::{CompositeData, CompositePlot};
pub use embedding::{EmbeddingLayers, EmbeddingPlot};
pub use expression::{ExpressionPoints, ExpressionScatter};
pub use rsp_curve::RspCurvePlot;
pub use summary::{BoxStats, ComparisonBarplot, CoverageBoxplot};
pub use traits::Plot;
