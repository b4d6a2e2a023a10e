use crate::options::{BasePlotOptions, EmbeddingPlotOptions, PlotOptions, RspCurvePlotOptions};
use derive_builder::Builder;

/// Options for the side-by-side embedding and RSP curve figure
///
/// `base` sets the overall canvas and suptitle; the panel options keep their
/// own titles and styling, while their sizes are taken from the canvas.
#[derive(Builder, Clone, Debug)]
#[builder(setter(into, strip_option), default)]
pub struct CompositePlotOptions {
    pub base: BasePlotOptions,

    pub embedding: EmbeddingPlotOptions,

    pub curve: RspCurvePlotOptions,
}

impl Default for CompositePlotOptions {
    fn default() -> Self {
        Self {
            base: BasePlotOptions {
                width: 1600,
                height: 800,
                title_size: 28,
                ..BasePlotOptions::titled("UMAP Embedding and RSP Curve")
            },
            embedding: EmbeddingPlotOptions::default(),
            curve: RspCurvePlotOptions::default(),
        }
    }
}

impl PlotOptions for CompositePlotOptions {
    fn base(&self) -> &BasePlotOptions {
        &self.base
    }
}

impl CompositePlotOptions {
    /// Create a new builder for CompositePlotOptions
    pub fn new() -> CompositePlotOptionsBuilder {
        CompositePlotOptionsBuilder::default()
    }
}
