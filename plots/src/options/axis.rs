use crate::PlotRange;
use derive_builder::Builder;

/// Options for configuring a plot axis
///
/// Controls the range and label for a single axis. Without a range, the plot
/// chooses one from the data.
///
/// # Example
///
/// ```rust,no_run
/// use rsp_plots::options::AxisOptions;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let axis = AxisOptions::new()
///     .range(-10.0..=10.0)
///     .label("UMAP 1")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug, Default, PartialEq)]
#[builder(setter(into, strip_option), default)]
pub struct AxisOptions {
    /// Fixed data range for this axis
    pub range: Option<PlotRange>,

    /// Optional axis label
    pub label: Option<String>,
}

impl AxisOptions {
    /// Create a new builder for AxisOptions
    pub fn new() -> AxisOptionsBuilder {
        AxisOptionsBuilder::default()
    }

    /// Axis with a label and automatic range
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            range: None,
            label: Some(label.into()),
        }
    }
}
