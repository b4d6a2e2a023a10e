use crate::options::{AxisOptions, BasePlotOptions, PlotOptions};
use derive_builder::Builder;
use plotters::style::RGBColor;

/// Options for per-group box plots
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct BoxplotOptions {
    pub base: BasePlotOptions,

    /// Value axis
    pub y_axis: AxisOptions,

    #[builder(default = "RGBColor(70, 130, 180)")]
    pub color: RGBColor,

    /// Box width as a fraction of the slot given to each group
    #[builder(default = "0.6")]
    pub box_width: f64,
}

impl Default for BoxplotOptions {
    fn default() -> Self {
        Self {
            base: BasePlotOptions {
                height: 600,
                ..BasePlotOptions::titled("Coverage")
            },
            y_axis: AxisOptions::labeled("Coverage"),
            color: RGBColor(70, 130, 180),
            box_width: 0.6,
        }
    }
}

impl PlotOptions for BoxplotOptions {
    fn base(&self) -> &BasePlotOptions {
        &self.base
    }
}

impl BoxplotOptions {
    /// Create a new builder for BoxplotOptions
    pub fn new() -> BoxplotOptionsBuilder {
        BoxplotOptionsBuilder::default()
    }
}

/// Options for labelled bar charts
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct BarplotOptions {
    pub base: BasePlotOptions,

    /// Value axis
    pub y_axis: AxisOptions,

    #[builder(default = "RGBColor(70, 130, 180)")]
    pub color: RGBColor,

    /// Bar width as a fraction of the slot given to each bar
    #[builder(default = "0.7")]
    pub bar_width: f64,
}

impl Default for BarplotOptions {
    fn default() -> Self {
        Self {
            base: BasePlotOptions {
                height: 600,
                ..BasePlotOptions::titled("RMSD")
            },
            y_axis: AxisOptions::labeled("RMSD"),
            color: RGBColor(70, 130, 180),
            bar_width: 0.7,
        }
    }
}

impl PlotOptions for BarplotOptions {
    fn base(&self) -> &BasePlotOptions {
        &self.base
    }
}

impl BarplotOptions {
    /// Create a new builder for BarplotOptions
    pub fn new() -> BarplotOptionsBuilder {
        BarplotOptionsBuilder::default()
    }
}
