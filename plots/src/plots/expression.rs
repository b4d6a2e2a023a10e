use crate::options::{ExpressionScatterOptions, PlotOptions};
use crate::plots::traits::Plot;
use crate::render::DrawResultExt;
use crate::square_window;
use anyhow::{Result, anyhow};
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;

const COLORBAR_STEPS: usize = 64;

/// Embedding coordinates with one expression value per point
#[derive(Debug, Clone)]
pub struct ExpressionPoints {
    /// `n x 2` coordinates
    pub coords: Array2<f64>,
    pub values: Vec<f32>,
}

impl ExpressionPoints {
    pub fn new(coords: Array2<f64>, values: Vec<f32>) -> Result<Self> {
        if coords.nrows() != values.len() {
            return Err(anyhow!(
                "{} points but {} expression values",
                coords.nrows(),
                values.len()
            ));
        }
        if coords.nrows() > 0 && coords.ncols() < 2 {
            return Err(anyhow!("Coordinates have {} columns; need 2", coords.ncols()));
        }
        Ok(Self { coords, values })
    }

    /// Range of the finite values; `(0, 1)` when there are none
    pub fn value_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo > hi { (0.0, 1.0) } else { (lo as f64, hi as f64) }
    }

    /// Point indices in drawing order: lowest values first, non-finite values dropped
    fn draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.values.len())
            .filter(|&i| self.values[i].is_finite())
            .collect();
        order.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));
        order
    }
}

fn normalize(value: f64, (lo, hi): (f64, f64)) -> f32 {
    if hi > lo {
        ((value - lo) / (hi - lo)) as f32
    } else {
        0.5
    }
}

/// Embedding scatter coloured by a continuous value, with a colour bar
///
/// Points are drawn in increasing value order so high expressors stay visible.
pub struct ExpressionScatter;

impl ExpressionScatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExpressionScatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Plot for ExpressionScatter {
    type Options = ExpressionScatterOptions;
    type Data = ExpressionPoints;

    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        let base = options.base();
        area.fill(&WHITE).draw_context("fill plot background")?;

        let (width, _) = area.dim_in_pixel();
        let bar_width = options.colorbar_width.min(width / 2);
        let (main, bar) = area.split_horizontally((width - bar_width) as i32);

        let coords: Vec<[f64; 2]> = data
            .coords
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1]])
            .collect();
        let (auto_x, auto_y) = square_window(&coords, None);
        let x_range = options.x_axis.range.clone().unwrap_or(auto_x);
        let y_range = options.y_axis.range.clone().unwrap_or(auto_y);

        let mut builder = ChartBuilder::on(&main);
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
            .draw_context("build expression chart")?;

        let mut mesh = chart.configure_mesh();
        mesh.x_max_light_lines(4).y_max_light_lines(4).x_labels(6).y_labels(6);
        if let Some(ref x_label) = options.x_axis.label {
            mesh.x_desc(x_label);
        }
        if let Some(ref y_label) = options.y_axis.label {
            mesh.y_desc(y_label);
        }
        mesh.draw().draw_context("draw expression mesh")?;

        let range = data.value_range();
        let colormap = options.colormap;
        let size = options.point_size;
        chart
            .draw_series(data.draw_order().into_iter().map(|i| {
                let [x, y] = coords[i];
                let color = colormap.map(normalize(data.values[i] as f64, range));
                Circle::new((x, y), size, color.filled())
            }))
            .draw_context("draw expression points")?;

        let (lo, hi) = if range.1 > range.0 {
            range
        } else {
            (range.0 - 0.5, range.1 + 0.5)
        };
        let mut bar_builder = ChartBuilder::on(&bar);
        bar_builder
            .margin(base.margin)
            .margin_top(base.margin + base.title_size + 10)
            .x_label_area_size(base.x_label_area_size)
            .y_label_area_size(base.y_label_area_size.min(bar_width / 2));
        let mut bar_chart = bar_builder
            .build_cartesian_2d(0.0..1.0, lo..hi)
            .draw_context("build colour bar")?;

        let step = (hi - lo) / COLORBAR_STEPS as f64;
        bar_chart
            .draw_series((0..COLORBAR_STEPS).map(|k| {
                let y0 = lo + step * k as f64;
                let color = colormap.map(normalize(y0 + step / 2.0, (lo, hi)));
                Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
            }))
            .draw_context("draw colour bar")?;

        let mut bar_mesh = bar_chart.configure_mesh();
        bar_mesh.disable_mesh().disable_x_axis().y_labels(5);
        if let Some(ref label) = options.value_label {
            bar_mesh.y_desc(label);
        }
        bar_mesh.draw().draw_context("draw colour bar axis")?;

        tracing::debug!(
            "Drew {} expression points, values {:.3}..{:.3}",
            data.values.len(),
            range.0,
            range.1
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_points_and_values_must_match() {
        assert!(ExpressionPoints::new(array![[0.0, 0.0], [1.0, 1.0]], vec![1.0]).is_err());
        assert!(ExpressionPoints::new(array![[0.0], [1.0]], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_draw_order_and_range() {
        let points =
            ExpressionPoints::new(array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]], vec![3.0, f32::NAN, 1.0])
                .unwrap();
        assert_eq!(points.draw_order(), vec![2, 0]);
        assert_eq!(points.value_range(), (1.0, 3.0));
        assert_eq!(normalize(2.0, (1.0, 3.0)), 0.5);
        assert_eq!(normalize(5.0, (5.0, 5.0)), 0.5);
    }
}
