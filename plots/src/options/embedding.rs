use crate::colormap::{CATEGORICAL, LIGHT_GRAY};
use crate::options::{AxisOptions, BasePlotOptions, PlotOptions};
use derive_builder::Builder;
use plotters::style::RGBColor;

/// Options for embedding scatter plots
///
/// # Example
///
/// ```rust,no_run
/// use rsp_plots::options::EmbeddingPlotOptions;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = EmbeddingPlotOptions::new()
///     .point_size(2u32)
///     .vantage_label("Glomerulus centre")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct EmbeddingPlotOptions {
    /// Base plot options (layout, dimensions, etc.)
    pub base: BasePlotOptions,

    pub x_axis: AxisOptions,

    pub y_axis: AxisOptions,

    /// Marker radius in pixels
    #[builder(default = "3")]
    pub point_size: u32,

    /// Colour of background points
    #[builder(default = "LIGHT_GRAY")]
    pub background_color: RGBColor,

    /// Foreground colours, cycled by group
    #[builder(default = "CATEGORICAL.to_vec()")]
    pub colors: Vec<RGBColor>,

    /// Legend entry of the vantage marker
    #[builder(default = "\"Vantage Point\".to_string()")]
    pub vantage_label: String,

    #[builder(default = "true")]
    pub show_legend: bool,
}

impl Default for EmbeddingPlotOptions {
    fn default() -> Self {
        Self {
            base: BasePlotOptions::titled("UMAP Embedding"),
            x_axis: AxisOptions::labeled("UMAP 1"),
            y_axis: AxisOptions::labeled("UMAP 2"),
            point_size: 3,
            background_color: LIGHT_GRAY,
            colors: CATEGORICAL.to_vec(),
            vantage_label: "Vantage Point".to_string(),
            show_legend: true,
        }
    }
}

impl PlotOptions for EmbeddingPlotOptions {
    fn base(&self) -> &BasePlotOptions {
        &self.base
    }
}

impl EmbeddingPlotOptions {
    /// Create a new builder for EmbeddingPlotOptions
    pub fn new() -> EmbeddingPlotOptionsBuilder {
        EmbeddingPlotOptionsBuilder::default()
    }

    /// Colour of the `index`-th foreground group
    pub fn color(&self, index: usize) -> RGBColor {
        match self.colors.len() {
            0 => crate::colormap::categorical_color(index),
            n => self.colors[index % n],
        }
    }
}
