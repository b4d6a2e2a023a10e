use crate::options::{PlotOptions, RspCurvePlotOptions};
use crate::plots::traits::Plot;
use crate::render::DrawResultExt;
use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use spatialrsp::RspCurves;
use std::f64::consts::TAU;

/// Segments per guide ring
const RING_SEGMENTS: usize = 180;

/// Closed Cartesian path of a polar curve, `(r cos θ, r sin θ)` per grid angle
///
/// Negative or non-finite radii are drawn at the origin.
pub fn polar_path(angles: &[f64], radii: &[f64]) -> Vec<(f64, f64)> {
    let mut path: Vec<(f64, f64)> = angles
        .iter()
        .zip(radii)
        .map(|(&theta, &r)| {
            let r = if r.is_finite() { r.max(0.0) } else { 0.0 };
            (r * theta.cos(), r * theta.sin())
        })
        .collect();
    if let Some(&first) = path.first() {
        path.push(first);
    }
    path
}

fn ring(radius: f64) -> Vec<(f64, f64)> {
    (0..=RING_SEGMENTS)
        .map(|i| {
            let theta = TAU * i as f64 / RING_SEGMENTS as f64;
            (radius * theta.cos(), radius * theta.sin())
        })
        .collect()
}

fn format_radius(value: f64) -> String {
    if value >= 10.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Polar plot of RSP curves
///
/// The polar axes are drawn in Cartesian projection: concentric guide rings
/// labelled with their radius and spokes labelled in degrees. The background
/// curve is dashed, each foreground is solid and its expected curve (absolute
/// mode) is dotted in the same colour.
pub struct RspCurvePlot;

impl RspCurvePlot {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RspCurvePlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Plot for RspCurvePlot {
    type Options = RspCurvePlotOptions;
    type Data = RspCurves;

    fn draw<DB: DrawingBackend>(
        &self,
        data: &Self::Data,
        options: &Self::Options,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<()> {
        let n = data.resolution();
        if n == 0 {
            return Err(anyhow!("RSP curves have an empty angle grid"));
        }
        if data.background.len() != n || data.foregrounds.iter().any(|fg| fg.curve.len() != n) {
            return Err(anyhow!("RSP curves do not match the {}-point angle grid", n));
        }

        let base = options.base();
        area.fill(&WHITE).draw_context("fill plot background")?;

        let r_max = match options.max_radius.unwrap_or_else(|| data.max_value()) {
            r if r > 0.0 && r.is_finite() => r,
            _ => 1.0,
        };
        let extent = r_max * 1.18;

        let mut builder = ChartBuilder::on(area);
        builder.margin(base.margin);
        if !base.title.is_empty() {
            builder.caption(&base.title, ("sans-serif", base.title_size as f64));
        }
        let mut chart = builder
            .build_cartesian_2d(-extent..extent, -extent..extent)
            .draw_context("build polar chart")?;

        let guide = BLACK.mix(0.25);
        let label_font = ("sans-serif", 13.0).into_font().color(&BLACK.mix(0.7));
        for k in 1..=options.rings.max(1) {
            let radius = r_max * k as f64 / options.rings.max(1) as f64;
            chart
                .draw_series(LineSeries::new(ring(radius), guide.stroke_width(1)))
                .draw_context("draw guide ring")?;
            let anchor = TAU / 16.0;
            chart
                .draw_series(std::iter::once(Text::new(
                    format_radius(radius),
                    (radius * anchor.cos(), radius * anchor.sin()),
                    label_font.clone(),
                )))
                .draw_context("label guide ring")?;
        }

        let spokes = options.spokes;
        for j in 0..spokes {
            let theta = TAU * j as f64 / spokes as f64;
            let tip = (r_max * theta.cos(), r_max * theta.sin());
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(0.0, 0.0), tip],
                    guide.stroke_width(1),
                )))
                .draw_context("draw spoke")?;
            let degrees = (j as f64 * 360.0 / spokes as f64).round();
            let label_at = r_max * 1.08;
            chart
                .draw_series(std::iter::once(Text::new(
                    format!("{}°", degrees),
                    (label_at * theta.cos(), label_at * theta.sin()),
                    label_font.clone(),
                )))
                .draw_context("label spoke")?;
        }

        let width = options.line_width;
        if options.show_background {
            let color = options.background_color;
            chart
                .draw_series(DashedLineSeries::new(
                    polar_path(&data.angles, &data.background),
                    10,
                    6,
                    color.stroke_width(width),
                ))
                .draw_context("draw background curve")?
                .label("Background")
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }

        for (index, fg) in data.foregrounds.iter().enumerate() {
            let color = options.color(index);
            chart
                .draw_series(LineSeries::new(
                    polar_path(&data.angles, &fg.curve),
                    color.stroke_width(width),
                ))
                .draw_context("draw foreground curve")?
                .label(fg.label.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });

            if let (true, Some(expected)) = (options.show_expected, &fg.expected) {
                if expected.len() != n {
                    return Err(anyhow!("Expected curve of '{}' has the wrong length", fg.label));
                }
                chart
                    .draw_series(DashedLineSeries::new(
                        polar_path(&data.angles, expected),
                        2,
                        5,
                        color.stroke_width(width),
                    ))
                    .draw_context("draw expected curve")?
                    .label(format!("{} (expected)", fg.label))
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 4, y)], color.stroke_width(2))
                    });
            }
        }

        if options.show_legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .draw_context("draw curve legend")?;
        }

        tracing::debug!(
            "Drew {} RSP curves over {} angles (outer radius {})",
            data.foregrounds.len(),
            n,
            format_radius(r_max)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_polar_path_is_closed() {
        let angles = [0.0, FRAC_PI_2, std::f64::consts::PI];
        let path = polar_path(&angles, &[1.0, 2.0, 0.5]);
        assert_eq!(path.len(), 4);
        assert_abs_diff_eq!(path[1].0, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(path[1].1, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(path[2].0, -0.5, epsilon = 1e-12);
        assert_eq!(path[0], path[3]);
    }

    #[test]
    fn test_polar_path_clamps_invalid_radii() {
        let path = polar_path(&[0.0, 1.0], &[-1.0, f64::NAN]);
        assert_eq!(path[0], (0.0, 0.0));
        assert_eq!(path[1], (0.0, 0.0));
        assert!(polar_path(&[], &[]).is_empty());
    }

    #[test]
    fn test_format_radius() {
        assert_eq!(format_radius(0.126), "0.13");
        assert_eq!(format_radius(42.4), "42");
    }
}
