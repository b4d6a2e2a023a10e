use crate::options::{EmbeddingPlotOptions, PlotOptions};
use crate::plots::traits::Plot;
use crate::render::DrawResultExt;
use crate::square_window;
use crate::PlotRange;
use anyhow::{Result, anyhow};
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;

/// Points of an embedding split into a background and labelled foregrounds
#[derive(Debug, Clone, Default)]
pub struct EmbeddingLayers {
    /// `n x 2` background coordinates
    pub background: Array2<f64>,
    /// Labelled `m x 2` foreground coordinates, drawn in order over the background
    pub foregrounds: Vec<(String, Array2<f64>)>,
    pub vantage: Option<[f64; 2]>,
}

impl EmbeddingLayers {
    pub fn new(background: Array2<f64>, foregrounds: Vec<(String, Array2<f64>)>) -> Self {
        Self {
            background,
            foregrounds,
            vantage: None,
        }
    }

    pub fn with_vantage(mut self, vantage: [f64; 2]) -> Self {
        self.vantage = Some(vantage);
        self
    }

    fn all_points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        std::iter::once(&self.background)
            .chain(self.foregrounds.iter().map(|(_, coords)| coords))
            .flat_map(|coords| points(coords))
            .map(|(x, y)| [x, y])
    }

    /// Square window centred on the vantage point, or on the data when there is none
    pub fn window(&self) -> (PlotRange, PlotRange) {
        let all: Vec<[f64; 2]> = self.all_points().collect();
        square_window(&all, self.vantage)
    }

    fn check(&self) -> Result<()> {
        let layers = std::iter::once(("background", &self.background))
            .chain(self.foregrounds.iter().map(|(label, c)| (label.as_str(), c)));
        for (label, coords) in layers {
            if coords.nrows() > 0 && coords.ncols() < 2 {
                return Err(anyhow!(
                    "Layer '{}' has {} columns; embeddings need 2",
                    label,
                    coords.ncols()
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn points(coords: &Array2<f64>) -> impl Iterator<Item = (f64, f64)> + '_ {
    coords.rows().into_iter().map(|row| (row[0], row[1]))
}

/// Scatter plot of an embedding with highlighted foreground groups
///
/// Background points are drawn first in light gray, then each foreground
/// group in the categorical palette, then the vantage point as a cross.
pub struct EmbeddingPlot;

impl EmbeddingPlot {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmbeddingPlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Plot for EmbeddingPlot {
    type Options = EmbeddingPlotOptions;
    type Data = EmbeddingLayers;

    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        data.check()?;
        let base = options.base();
        area.fill(&WHITE).draw_context("fill plot background")?;

        let (auto_x, auto_y) = data.window();
        let x_range = options.x_axis.range.clone().unwrap_or(auto_x);
        let y_range = options.y_axis.range.clone().unwrap_or(auto_y);

        let mut builder = ChartBuilder::on(area);
        builder
            .margin(base.margin)
            .x_label_area_size(base.x_label_area_size)
            .y_label_area_size(base.y_label_area_size);
        if !base.title.is_empty() {
            builder.caption(&base.title, ("sans-serif", base.title_size as f64));
        }
        let mut chart = builder
            .build_cartesian_2d(
                *x_range.start()..*x_range.end(),
                *y_range.start()..*y_range.end(),
            )
            .draw_context("build embedding chart")?;

        let mut mesh = chart.configure_mesh();
        mesh.x_max_light_lines(4).y_max_light_lines(4).x_labels(6).y_labels(6);
        if let Some(ref x_label) = options.x_axis.label {
            mesh.x_desc(x_label);
        }
        if let Some(ref y_label) = options.y_axis.label {
            mesh.y_desc(y_label);
        }
        mesh.draw().draw_context("draw embedding mesh")?;

        let size = options.point_size;
        let background = options.background_color;
        chart
            .draw_series(points(&data.background).map(|p| Circle::new(p, size, background.filled())))
            .draw_context("draw background points")?
            .label("Background")
            .legend(move |(x, y)| Circle::new((x, y), 4, background.filled()));

        for (index, (label, coords)) in data.foregrounds.iter().enumerate() {
            let color = options.color(index);
            chart
                .draw_series(points(coords).map(|p| Circle::new(p, size, color.filled())))
                .draw_context("draw foreground points")?
                .label(label.as_str())
                .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        }

        if let Some([vx, vy]) = data.vantage {
            chart
                .draw_series(std::iter::once(Cross::new(
                    (vx, vy),
                    size.max(3) * 3,
                    BLACK.stroke_width(3),
                )))
                .draw_context("draw vantage point")?
                .label(options.vantage_label.as_str())
                .legend(|(x, y)| Cross::new((x, y), 5, BLACK.stroke_width(2)));
        }

        if options.show_legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .draw_context("draw embedding legend")?;
        }

        tracing::debug!(
            "Drew embedding: {} background points, {} foreground groups",
            data.background.nrows(),
            data.foregrounds.len()
        );
        Ok(())
    }
}
