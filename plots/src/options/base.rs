use derive_builder::Builder;

/// Base plot options containing layout and display settings
///
/// These options are common to all plot types and control the overall
/// appearance and layout of the plot.
///
/// # Example
///
/// ```rust,no_run
/// use rsp_plots::options::BasePlotOptions;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let base = BasePlotOptions::new()
///     .width(800u32)
///     .height(600u32)
///     .title("My Plot")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(setter(into, strip_option), default)]
pub struct BasePlotOptions {
    /// Plot width in pixels
    #[builder(default = "800")]
    pub width: u32,

    /// Plot height in pixels
    #[builder(default = "800")]
    pub height: u32,

    /// Margin around the plot area in pixels
    #[builder(default = "10")]
    pub margin: u32,

    /// Size of the x-axis label area in pixels
    #[builder(default = "40")]
    pub x_label_area_size: u32,

    /// Size of the y-axis label area in pixels
    #[builder(default = "50")]
    pub y_label_area_size: u32,

    /// Plot title; empty for none
    pub title: String,

    /// Title font size in pixels
    #[builder(default = "22")]
    pub title_size: u32,
}

impl Default for BasePlotOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            margin: 10,
            x_label_area_size: 40,
            y_label_area_size: 50,
            title: String::new(),
            title_size: 22,
        }
    }
}

impl BasePlotOptions {
    /// Create a new builder for BasePlotOptions
    pub fn new() -> BasePlotOptionsBuilder {
        BasePlotOptionsBuilder::default()
    }

    /// Default options with the given title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}
