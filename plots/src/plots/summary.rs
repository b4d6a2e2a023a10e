use crate::nice_bounds;
use crate::options::{BarplotOptions, BoxplotOptions, PlotOptions};
use crate::plots::traits::Plot;
use crate::render::DrawResultExt;
use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;

/// Five-number summary of one group, with Tukey whiskers
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value at or above `q1 - 1.5 * IQR`
    pub lower_whisker: f64,
    /// Largest value at or below `q3 + 1.5 * IQR`
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Summarise the finite values of a group; `None` when there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = sorted.iter().filter(|&&v| v >= low_fence && v <= high_fence);
        let lower_whisker = inside.clone().copied().fold(f64::INFINITY, f64::min);
        let upper_whisker = inside.copied().fold(f64::NEG_INFINITY, f64::max);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < low_fence || v > high_fence)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }

    fn extent(&self) -> (f64, f64) {
        self.outliers
            .iter()
            .fold((self.lower_whisker, self.upper_whisker), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Linearly interpolated quantile of sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Axis label for category slot `x`; blank between slots
fn category_label(labels: &[String], x: f64) -> String {
    let slot = x.round();
    if (x - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

fn value_range(axis: Option<&crate::PlotRange>, lo: f64, hi: f64) -> (f64, f64) {
    match axis {
        Some(range) => (*range.start(), *range.end()),
        None => nice_bounds(lo, hi),
    }
}

/// Box plot of a value distribution per group, e.g. coverage across samples
pub struct CoverageBoxplot;

impl CoverageBoxplot {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoverageBoxplot {
    fn default() -> Self {
        Self::new()
    }
}

impl Plot for CoverageBoxplot {
    type Options = BoxplotOptions;
    type Data = [(String, Vec<f64>)];

    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        if data.is_empty() {
            return Err(anyhow!("Box plot needs at least one group"));
        }
        let labels: Vec<String> = data.iter().map(|(label, _)| label.clone()).collect();
        let stats: Vec<Option<BoxStats>> = data
            .iter()
            .map(|(_, values)| BoxStats::from_values(values))
            .collect();

        let (lo, hi) = stats
            .iter()
            .flatten()
            .map(BoxStats::extent)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| {
                (lo.min(a), hi.max(b))
            });
        let (y_min, y_max) = value_range(options.y_axis.range.as_ref(), lo, hi);

        let base = options.base();
        area.fill(&WHITE).draw_context("fill plot background")?;
        let mut builder = ChartBuilder::on(area);
        builder
            .margin(base.margin)
            .x_label_area_size(base.x_label_area_size)
            .y_label_area_size(base.y_label_area_size);
        if !base.title.is_empty() {
            builder.caption(&base.title, ("sans-serif", base.title_size as f64));
        }
        let mut chart = builder
            .build_cartesian_2d(-0.5..(data.len() as f64 - 0.5), y_min..y_max)
            .draw_context("build box plot chart")?;

        let formatter = |x: &f64| category_label(&labels, *x);
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(data.len() + 1)
            .x_label_formatter(&formatter);
        if let Some(ref y_label) = options.y_axis.label {
            mesh.y_desc(y_label);
        }
        mesh.draw().draw_context("draw box plot mesh")?;

        let half = options.box_width.clamp(0.05, 1.0) / 2.0;
        let color = options.color;
        for (slot, group) in stats.iter().enumerate() {
            let Some(group) = group else {
                tracing::warn!("Group '{}' has no finite values; skipping", labels[slot]);
                continue;
            };
            let x = slot as f64;
            let corners = [(x - half, group.q1), (x + half, group.q3)];
            chart
                .draw_series([
                    Rectangle::new(corners, color.mix(0.5).filled()),
                    Rectangle::new(corners, color.stroke_width(1)),
                ])
                .draw_context("draw box")?;

            let cap = half / 2.0;
            let whisker = BLACK.stroke_width(1);
            chart
                .draw_series([
                    PathElement::new(vec![(x - half, group.median), (x + half, group.median)], BLACK.stroke_width(2)),
                    PathElement::new(vec![(x, group.q3), (x, group.upper_whisker)], whisker),
                    PathElement::new(vec![(x, group.q1), (x, group.lower_whisker)], whisker),
                    PathElement::new(vec![(x - cap, group.upper_whisker), (x + cap, group.upper_whisker)], whisker),
                    PathElement::new(vec![(x - cap, group.lower_whisker), (x + cap, group.lower_whisker)], whisker),
                ])
                .draw_context("draw whiskers")?;
            chart
                .draw_series(group.outliers.iter().map(|&v| Circle::new((x, v), 3, BLACK.stroke_width(1))))
                .draw_context("draw outliers")?;
        }
        Ok(())
    }
}

/// Bar chart of one value per label, e.g. RMSD per group
pub struct ComparisonBarplot;

impl ComparisonBarplot {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComparisonBarplot {
    fn default() -> Self {
        Self::new()
    }
}

impl Plot for ComparisonBarplot {
    type Options = BarplotOptions;
    type Data = [(String, f64)];

    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        if data.is_empty() {
            return Err(anyhow!("Bar plot needs at least one value"));
        }
        let labels: Vec<String> = data.iter().map(|(label, _)| label.clone()).collect();
        let (lo, hi) = data
            .iter()
            .map(|&(_, v)| v)
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let (y_min, y_max) = value_range(options.y_axis.range.as_ref(), lo, hi * 1.1);

        let base = options.base();
        area.fill(&WHITE).draw_context("fill plot background")?;
        let mut builder = ChartBuilder::on(area);
        builder
            .margin(base.margin)
            .x_label_area_size(base.x_label_area_size)
            .y_label_area_size(base.y_label_area_size);
        if !base.title.is_empty() {
            builder.caption(&base.title, ("sans-serif", base.title_size as f64));
        }
        let mut chart = builder
            .build_cartesian_2d(-0.5..(data.len() as f64 - 0.5), y_min..y_max)
            .draw_context("build bar chart")?;

        let formatter = |x: &f64| category_label(&labels, *x);
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(data.len() + 1)
            .x_label_formatter(&formatter);
        if let Some(ref y_label) = options.y_axis.label {
            mesh.y_desc(y_label);
        }
        mesh.draw().draw_context("draw bar chart mesh")?;

        let half = options.bar_width.clamp(0.05, 1.0) / 2.0;
        let color = options.color;
        chart
            .draw_series(data.iter().enumerate().filter(|(_, (_, v))| v.is_finite()).map(
                |(slot, &(_, value))| {
                    let x = slot as f64;
                    Rectangle::new([(x - half, 0.0), (x + half, value)], color.filled())
                },
            ))
            .draw_context("draw bars")?;
        chart
            .draw_series(data.iter().enumerate().filter(|(_, (_, v))| v.is_finite()).map(
                |(slot, &(_, value))| {
                    Text::new(
                        format!("{:.3}", value),
                        (slot as f64 - half / 2.0, value),
                        ("sans-serif", 13.0).into_font(),
                    )
                },
            ))
            .draw_context("label bars")?;
        Ok(())
    }
}
