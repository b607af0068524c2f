//! Plot of the integrand with the integrated area shaded.
//!
//! [`PlotRenderer`] is the capability the CLI hands results to; [`PlottersRenderer`] draws
//! with `plotters` into a PNG or SVG file depending on the extension of the output path.
use crate::pipeline::{PipelineOutput, SampleSet};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("nothing to plot: the expression is undefined at every sample point")]
    NoDefinedPoints,
    #[error("unsupported plot format `{0}`, use .png or .svg")]
    UnsupportedFormat(String),
    #[error("plotting failed: {0}")]
    Drawing(String),
}

fn drawing_error<E: Display>(e: E) -> PlotError {
    PlotError::Drawing(e.to_string())
}

/// Everything a renderer needs; no pipeline types leak into the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    /// `None` marks an undefined point, where the curve is broken
    pub y: Vec<Option<f64>>,
    /// region between the curve and the x-axis to shade
    pub shaded: Option<(f64, f64)>,
}

impl PlotData {
    pub fn from_output<X: Display>(output: &PipelineOutput<X>) -> PlotData {
        let bounds = output.integral.bounds;
        PlotData {
            title: format!(
                "{}  on [{}, {}]",
                output.expression,
                bounds.lower(),
                bounds.upper()
            ),
            x_label: output.variable.clone(),
            y_label: format!("f({})", output.variable),
            x: output.samples.x.clone(),
            y: output.samples.y.clone(),
            shaded: if bounds.is_empty() {
                None
            } else {
                Some((bounds.lower(), bounds.upper()))
            },
        }
    }

    fn samples(&self) -> SampleSet {
        SampleSet {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }

    /// y window of the plot: the 1st to 99th percentile of the defined values, widened to
    /// contain the axis, so a pole does not flatten the rest of the curve.
    pub fn y_limits(&self) -> Option<(f64, f64)> {
        let mut defined: Vec<f64> = self.y.iter().flatten().copied().collect();
        if defined.is_empty() {
            return None;
        }
        defined.sort_by(f64::total_cmp);
        let last = defined.len() - 1;
        let lo = defined[last / 100];
        let hi = defined[last - last / 100];
        let (lo, hi) = (lo.min(0.0), hi.max(0.0));
        let margin = if hi > lo { 0.05 * (hi - lo) } else { 1.0 };
        Some((lo - margin, hi + margin))
    }
}

pub trait PlotRenderer {
    fn render(&self, data: &PlotData, path: &Path) -> Result<(), PlotError>;
}

///////////////// IMPLEMENTATION OF THE TRAIT FOR PLOTTERS /////////////////////////
#[derive(Debug, Clone, Copy)]
pub struct PlottersRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        PlottersRenderer {
            width: 800,
            height: 600,
        }
    }
}

impl PlotRenderer for PlottersRenderer {
    fn render(&self, data: &PlotData, path: &Path) -> Result<(), PlotError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        let size = (self.width, self.height);
        match extension.as_str() {
            "png" => draw(BitMapBackend::new(path, size).into_drawing_area(), data)?,
            "svg" => draw(SVGBackend::new(path, size).into_drawing_area(), data)?,
            other => return Err(PlotError::UnsupportedFormat(other.to_string())),
        }
        info!("plot saved to {}", path.display());
        Ok(())
    }
}

/// Part of a curve segment over `[lower, upper]`, with the curve interpolated linearly at
/// the bounds so the shading reaches them exactly.
fn shaded_outline(segment: &[(f64, f64)], lower: f64, upper: f64) -> Vec<(f64, f64)> {
    let inside = |x: f64| x >= lower && x <= upper;
    let mut outline: Vec<(f64, f64)> = segment
        .first()
        .copied()
        .filter(|(x, _)| inside(*x))
        .into_iter()
        .collect();
    for pair in segment.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        for edge in [lower, upper] {
            if x0 < edge && edge < x1 {
                outline.push((edge, y0 + (y1 - y0) * (edge - x0) / (x1 - x0)));
            }
        }
        if inside(x1) {
            outline.push((x1, y1));
        }
    }
    outline
}

fn draw<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, data: &PlotData) -> Result<(), PlotError> {
    let (y_min, y_max) = data.y_limits().ok_or(PlotError::NoDefinedPoints)?;
    let (x_min, x_max) = match (data.x.first(), data.x.last()) {
        (Some(&first), Some(&last)) if last > first => (first, last),
        _ => return Err(PlotError::NoDefinedPoints),
    };
    // out-of-window values are pinned to its edge
    let clamp = |(x, y): (f64, f64)| (x, y.clamp(y_min, y_max));
    let segments: Vec<Vec<(f64, f64)>> = data
        .samples()
        .defined_segments()
        .into_iter()
        .map(|segment| segment.into_iter().map(clamp).collect())
        .collect();

    root.fill(&WHITE).map_err(drawing_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&data.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(drawing_error)?;
    chart
        .configure_mesh()
        .x_desc(&data.x_label)
        .y_desc(&data.y_label)
        .draw()
        .map_err(drawing_error)?;

    if let Some((lower, upper)) = data.shaded {
        for segment in &segments {
            let inside = shaded_outline(segment, lower, upper);
            if inside.len() < 2 {
                continue;
            }
            chart
                .draw_series(AreaSeries::new(inside, 0.0, BLUE.mix(0.2)))
                .map_err(drawing_error)?;
        }
        for bound in [lower, upper] {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(bound, y_min), (bound, y_max)],
                    BLACK.mix(0.6).stroke_width(1),
                )))
                .map_err(drawing_error)?;
        }
    }

    // x-axis
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x_min, 0.0), (x_max, 0.0)],
            BLACK.stroke_width(1),
        )))
        .map_err(drawing_error)?;

    for (i, segment) in segments.into_iter().enumerate() {
        let series = chart
            .draw_series(LineSeries::new(segment, BLUE.stroke_width(2)))
            .map_err(drawing_error)?;
        if i == 0 {
            series.label(data.y_label.clone()).legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2))
            });
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing_error)?;
    root.present().map_err(drawing_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ExpressionPipeline;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn data(text: &str, lower: f64, upper: f64) -> PlotData {
        let output = ExpressionPipeline::default()
            .run(text, lower, upper, None)
            .unwrap();
        PlotData::from_output(&output)
    }

    #[test]
    fn test_plot_data_from_output() {
        let data = data("1/x", -1.0, 1.0);
        assert_eq!(data.x_label, "x");
        assert_eq!(data.shaded, Some((-1.0, 1.0)));
        assert!(data.y.iter().any(|y| y.is_none()));
        assert!(data.title.starts_with("1/x"));
        assert_eq!(data.samples().defined_segments().len(), 2);
    }

    #[test]
    fn test_y_limits_ignore_poles_and_contain_axis() {
        let (lo, hi) = data("1/x", -1.0, 1.0).y_limits().unwrap();
        assert!(lo < -0.5 && hi > 0.5);
        assert!(hi < 500.0 && lo > -500.0);
        let (lo, _) = data("x**2 + 1", 0.0, 1.0).y_limits().unwrap();
        assert!(lo <= 0.0);
        let empty = PlotData {
            y: vec![None, None],
            ..data("x", 0.0, 1.0)
        };
        assert_eq!(empty.y_limits(), None);
    }

    #[test]
    fn test_shading_reaches_the_bounds() {
        let line: Vec<(f64, f64)> = [0.0, 0.4, 0.8, 1.2].iter().map(|&x| (x, 2.0 * x)).collect();
        let outline = shaded_outline(&line, 0.1, 1.0);
        assert_eq!(outline.len(), 4);
        assert_eq!(outline[0].0, 0.1);
        assert_relative_eq!(outline[0].1, 0.2, epsilon = 1e-12);
        assert_eq!(&outline[1..3], &line[1..3]);
        assert_eq!(outline[3].0, 1.0);
        assert_relative_eq!(outline[3].1, 2.0, epsilon = 1e-12);

        // both bounds between the same pair of samples
        let outline = shaded_outline(&line, 0.5, 0.7);
        assert_eq!(outline.iter().map(|p| p.0).collect::<Vec<_>>(), vec![0.5, 0.7]);
        // a sample on a bound is kept as is
        assert_eq!(shaded_outline(&line, 0.4, 0.8), line[1..3].to_vec());
        assert!(shaded_outline(&line, 2.0, 3.0).is_empty());

        let data = data("x**2", 0.0, 1.0);
        let segment = &data.samples().defined_segments()[0];
        let outline = shaded_outline(segment, 0.3, 0.7);
        assert_eq!(outline.first().map(|p| p.0), Some(0.3));
        assert_eq!(outline.last().map(|p| p.0), Some(0.7));
    }

    #[test]
    fn test_render_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("integral.svg");
        let result = PlottersRenderer::default().render(&data("sin(x) + x**2", 0.0, 2.0), &path);
        match result {
            Ok(()) => {
                let svg = std::fs::read_to_string(&path).unwrap();
                assert!(svg.contains("<svg"));
                assert!(svg.contains("<polygon") || svg.contains("<path"));
            }
            // hosts without system fonts cannot lay out the caption
            Err(PlotError::Drawing(msg)) => assert!(msg.to_lowercase().contains("font"), "{}", msg),
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempdir().unwrap();
        let err = PlottersRenderer::default()
            .render(&data("x", 0.0, 1.0), &dir.path().join("plot.gif"))
            .unwrap_err();
        assert!(matches!(err, PlotError::UnsupportedFormat(ext) if ext == "gif"));
    }

    #[test]
    fn test_nothing_to_plot() {
        let dir = tempdir().unwrap();
        let empty = PlotData {
            y: vec![None; 3],
            x: vec![0.0, 1.0, 2.0],
            ..data("x", 0.0, 1.0)
        };
        let err = PlottersRenderer::default()
            .render(&empty, &dir.path().join("plot.svg"))
            .unwrap_err();
        assert!(matches!(err, PlotError::NoDefinedPoints));
    }
}
