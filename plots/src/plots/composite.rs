use crate::options::{CompositePlotOptions, PlotOptions};
use crate::plots::embedding::{EmbeddingLayers, EmbeddingPlot};
use crate::plots::rsp_curve::RspCurvePlot;
use crate::plots::traits::Plot;
use crate::render::DrawResultExt;
use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use spatialrsp::RspCurves;

/// Embedding and RSP curves of one analysis
#[derive(Debug, Clone)]
pub struct CompositeData {
    pub embedding: EmbeddingLayers,
    pub curves: RspCurves,
}

/// Embedding (left) and polar RSP curves (right) under a shared title
pub struct CompositePlot;

impl CompositePlot {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CompositePlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Plot for CompositePlot {
    type Options = CompositePlotOptions;
    type Data = CompositeData;

    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        let base = options.base();
        area.fill(&WHITE).draw_context("fill plot background")?;

        let body = if base.title.is_empty() {
            area.clone()
        } else {
            area.titled(&base.title, ("sans-serif", base.title_size as f64))
                .draw_context("draw composite title")?
        };

        let panels = body.split_evenly((1, 2));
        let [left, right] = panels.as_slice() else {
            return Err(anyhow!("expected two panels, got {}", panels.len()));
        };
        EmbeddingPlot.draw(&data.embedding, &options.embedding, left)?;
        RspCurvePlot.draw(&data.curves, &options.curve, right)?;
        Ok(())
    }
}
