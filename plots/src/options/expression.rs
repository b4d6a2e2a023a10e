use crate::colormap::ColorMaps;
use crate::options::{AxisOptions, BasePlotOptions, PlotOptions};
use derive_builder::Builder;

/// Options for embeddings coloured by expression
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct ExpressionScatterOptions {
    pub base: BasePlotOptions,

    pub x_axis: AxisOptions,

    pub y_axis: AxisOptions,

    #[builder(default = "ColorMaps::Viridis")]
    pub colormap: ColorMaps,

    /// Marker radius in pixels
    #[builder(default = "3")]
    pub point_size: u32,

    /// Colour bar caption, usually the gene name
    pub value_label: Option<String>,

    /// Width of the colour bar panel in pixels
    #[builder(default = "90")]
    pub colorbar_width: u32,
}

impl Default for ExpressionScatterOptions {
    fn default() -> Self {
        Self {
            base: BasePlotOptions::titled("Expression"),
            x_axis: AxisOptions::labeled("UMAP 1"),
            y_axis: AxisOptions::labeled("UMAP 2"),
            colormap: ColorMaps::Viridis,
            point_size: 3,
            value_label: None,
            colorbar_width: 90,
        }
    }
}

impl PlotOptions for ExpressionScatterOptions {
    fn base(&self) -> &BasePlotOptions {
        &self.base
    }
}

impl ExpressionScatterOptions {
    /// Create a new builder for ExpressionScatterOptions
    pub fn new() -> ExpressionScatterOptionsBuilder {
        ExpressionScatterOptionsBuilder::default()
    }
}
