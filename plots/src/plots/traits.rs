use crate::PlotBytes;
use crate::options::PlotOptions;
use crate::render::{DrawResultExt, OutputFormat, encode_png};
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Trait for plot types
///
/// This trait defines the interface that all plot types must implement.
/// Each plot type specifies its own options type and data type, and draws onto
/// any plotters drawing area; rendering to bytes and saving to a file are
/// provided on top of [`Plot::draw`].
///
/// # Example
///
/// ```rust,no_run
/// use rsp_plots::plots::traits::Plot;
/// use rsp_plots::options::{PlotOptions, BasePlotOptions};
/// use plotters::coord::Shift;
/// use plotters::prelude::*;
/// use anyhow::Result;
///
/// struct MyPlotOptions {
///     base: BasePlotOptions,
/// }
///
/// impl PlotOptions for MyPlotOptions {
///     fn base(&self) -> &BasePlotOptions { &self.base }
/// }
///
/// struct MyPlot;
///
/// impl Plot for MyPlot {
///     type Options = MyPlotOptions;
///     type Data = [(f64, f64)];
///
///     fn draw<DB: DrawingBackend>(
///         &self,
///         data: &Self::Data,
///         options: &Self::Options,
///         area: &DrawingArea<DB, Shift>,
///     ) -> Result<()> {
///         // ... your drawing logic
///         Ok(())
///     }
/// }
/// ```
pub trait Plot {
    /// The options type for this plot
    type Options: PlotOptions;

    /// The data type this plot accepts
    type Data: ?Sized;

    /// Draw the plot onto `area`, which the plot fills entirely
    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()>;

    /// Render the plot at the size given by the base options
    ///
    /// # Returns
    ///
    /// PNG-encoded plot image bytes
    fn render(&self, data: &Self::Data, options: &Self::Options) -> Result<PlotBytes> {
        let base = options.base();
        let (width, height) = (base.width, base.height);
        let mut pixels = vec![255u8; (width as usize) * (height as usize) * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            self.draw(data, options, &root)?;
            root.present().draw_context("present plot buffer")?;
        }
        encode_png(&pixels, width, height)
    }

    /// Save the plot as PNG or SVG, depending on the extension of `path`
    fn save(&self, data: &Self::Data, options: &Self::Options, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = OutputFormat::from_path(path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let size = (options.base().width, options.base().height);
        match format {
            OutputFormat::Png => {
                let root = BitMapBackend::new(path, size).into_drawing_area();
                self.draw(data, options, &root)?;
                root.present().draw_context("write PNG")?;
            }
            OutputFormat::Svg => {
                let root = SVGBackend::new(path, size).into_drawing_area();
                self.draw(data, options, &root)?;
                root.present().draw_context("write SVG")?;
            }
        }
        tracing::info!("Saved plot to {}", path.display());
        Ok(())
    }
}
