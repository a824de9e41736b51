//! Chart rendering with `plotters`.

use std::path::Path;

use itertools::Itertools;
use log::info;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::presentation::{self, ColorMagnitude, Plot, Window};

const SIZE: (u32, u32) = (1024, 768);

/// Draw `plot` into an image file.
///
/// The format follows the extension: `.svg` produces a vector image, everything else a bitmap
/// whose encoding is chosen by the extension (`.png`, `.bmp`, ...).
pub fn render<P: AsRef<Path>>(plot: &Plot<f64>, path: P) -> Result<()> {
    let path = path.as_ref();
    let svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    let drawn = if svg {
        draw(SVGBackend::new(path, SIZE).into_drawing_area(), plot).map_err(|e| e.to_string())
    } else {
        draw(BitMapBackend::new(path, SIZE).into_drawing_area(), plot).map_err(|e| e.to_string())
    };
    drawn.map_err(Error::Render)?;

    info!("Wrote chart to {}.", path.display());
    Ok(())
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    plot: &Plot<f64>,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    match plot {
        Plot::Scatter { series, window } => draw_scatter(&root, series, window)?,
        Plot::Histogram(histogram) => draw_histogram(&root, histogram)?,
    }
    root.present()
}

/// Color-magnitude diagram. Magnitudes are plotted negated so that bright stars end up at the
/// top, and labelled with their actual value.
fn draw_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &ColorMagnitude<f64>,
    window: &Window,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let [color_min, color_max] = window.color;
    let [mag_min, mag_max] = window.magnitude;

    let mut chart = ChartBuilder::on(root)
        .caption("Color-magnitude diagram", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(color_min..color_max, -mag_max..-mag_min)?;

    chart
        .configure_mesh()
        .x_desc("Color index [mag]")
        .y_desc("Magnitude [mag]")
        .y_label_formatter(&|v: &f64| format!("{:.1}", -v))
        .draw()?;

    chart.draw_series(
        series
            .points()
            .filter(|&(c, m)| {
                (color_min..=color_max).contains(&c) && (mag_min..=mag_max).contains(&m)
            })
            .map(|(c, m)| Circle::new((c, -m), 1, BLUE.filled())),
    )?;

    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    histogram: &presentation::Histogram<f64>,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let highest = histogram.counts.iter().copied().max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(root)
        .caption("Magnitude distribution", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(histogram.min..histogram.max, 0f64..highest as f64 * 1.05)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Magnitude [mag]")
        .y_desc("Stars")
        .draw()?;

    let edges = histogram.edges();
    chart.draw_series(
        histogram
            .counts
            .iter()
            .zip(edges.iter().tuple_windows())
            .map(|(&count, (&lo, &hi))| {
                Rectangle::new([(lo, 0.), (hi, count as f64)], BLUE.mix(0.6).filled())
            }),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::matching::MatchedPair;
    use crate::presentation::PlotMode;

    fn pairs() -> Vec<MatchedPair<f64>> {
        vec![
            MatchedPair::new(27.5, 26.25),
            MatchedPair::new(28.1, 28.5),
            MatchedPair::new(29.3, 28.),
            MatchedPair::new(35., 20.),
        ]
    }

    #[test]
    fn unwritable_path() {
        let plot = PlotMode::Scatter(Window::default()).plot(&pairs());
        let err = render(&plot, "/nonexistent/directory/chart.png").unwrap_err();

        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn scatter_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.svg");

        let plot = PlotMode::Scatter(Window::default()).plot(&pairs());
        render(&plot, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn histogram_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.png");

        let plot = PlotMode::Histogram(NonZeroUsize::new(10).unwrap()).plot(&pairs());
        render(&plot, &path).unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
