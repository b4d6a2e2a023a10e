use crate::colormap::CATEGORICAL;
use crate::options::{BasePlotOptions, PlotOptions};
use derive_builder::Builder;
use plotters::style::RGBColor;

/// Options for polar RSP curve plots
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct RspCurvePlotOptions {
    /// Base plot options (layout, dimensions, etc.)
    pub base: BasePlotOptions,

    /// Number of concentric guide rings
    #[builder(default = "4")]
    pub rings: usize,

    /// Number of radial spokes
    #[builder(default = "8")]
    pub spokes: usize,

    /// Fixed outer radius; the largest curve value when unset
    pub max_radius: Option<f64>,

    /// Draw the background curve (dashed)
    #[builder(default = "true")]
    pub show_background: bool,

    /// Draw expected curves (dotted) when present
    #[builder(default = "true")]
    pub show_expected: bool,

    /// Foreground colours, cycled by curve
    #[builder(default = "CATEGORICAL.to_vec()")]
    pub colors: Vec<RGBColor>,

    #[builder(default = "RGBColor(90, 90, 90)")]
    pub background_color: RGBColor,

    /// Line width in pixels
    #[builder(default = "2")]
    pub line_width: u32,

    #[builder(default = "true")]
    pub show_legend: bool,
}

impl Default for RspCurvePlotOptions {
    fn default() -> Self {
        Self {
            base: BasePlotOptions::titled("RSP Curve"),
            rings: 4,
            spokes: 8,
            max_radius: None,
            show_background: true,
            show_expected: true,
            colors: CATEGORICAL.to_vec(),
            background_color: RGBColor(90, 90, 90),
            line_width: 2,
            show_legend: true,
        }
    }
}

impl PlotOptions for RspCurvePlotOptions {
    fn base(&self) -> &BasePlotOptions {
        &self.base
    }
}

impl RspCurvePlotOptions {
    /// Create a new builder for RspCurvePlotOptions
    pub fn new() -> RspCurvePlotOptionsBuilder {
        RspCurvePlotOptionsBuilder::default()
    }

    /// Colour of the `index`-th foreground curve
    pub fn color(&self, index: usize) -> RGBColor {
        match self.colors.len() {
            0 => crate::colormap::categorical_color(index),
            n => self.colors[index % n],
        }
    }
}
