//! Mapping of matched pairs to the series shown in a chart.

use std::cmp::Ordering;
use std::num::NonZeroUsize;

use itertools::{Itertools, MinMaxResult};
use serde::Deserialize;

use crate::matching::MatchedPair;
use crate::Float;

/// Color-magnitude series derived from matched pairs.
///
/// `magnitudes[i]` and `colors[i]` belong to the same pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMagnitude<F> {
    /// Magnitudes in the second image.
    pub magnitudes: Vec<F>,
    /// First magnitude minus second magnitude.
    pub colors: Vec<F>,
}

impl<F: Float> ColorMagnitude<F> {
    /// Split matched pairs into index-aligned magnitude and color series.
    pub fn from_pairs(pairs: &[MatchedPair<F>]) -> Self {
        let (magnitudes, colors) = pairs.iter().map(|p| (p.magnitude_b, p.color())).unzip();
        Self { magnitudes, colors }
    }

    /// `(color, magnitude)` points of a color-magnitude diagram.
    pub fn points(&self) -> impl Iterator<Item = (F, F)> + '_ {
        self.colors.iter().copied().zip(self.magnitudes.iter().copied())
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}

/// Counts of values in equal-width bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram<F> {
    /// Left edge of the first bin.
    pub min: F,
    /// Right edge of the last bin.
    pub max: F,
    /// Number of values per bin.
    pub counts: Vec<usize>,
}

impl<F: Float> Histogram<F> {
    /// Bucket `values` into `bins` bins spanning their range.
    ///
    /// Every bin is half-open except the last one, which also holds the maximum.
    /// If all values are equal the range is widened by 0.5 to either side,
    /// and without any values it is `[0, 1]`. NaN and infinite values are not counted.
    pub fn new(values: &[F], bins: NonZeroUsize) -> Self {
        let finite = || values.iter().copied().filter(|v| v.is_finite());
        let half = F::from_f64(0.5).unwrap();
        let range = finite().minmax_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let (min, max) = match range {
            MinMaxResult::NoElements => (F::zero(), F::one()),
            MinMaxResult::OneElement(v) => (v - half, v + half),
            MinMaxResult::MinMax(min, max) if min == max => (min - half, max + half),
            MinMaxResult::MinMax(min, max) => (min, max),
        };

        let bins = bins.get();
        let mut counts = vec![0; bins];
        let width = (max - min) / F::from_usize(bins).unwrap();
        for v in finite() {
            let bin = ((v - min) / width).floor().to_usize().unwrap_or(0);
            counts[bin.min(bins - 1)] += 1;
        }

        Self { min, max, counts }
    }

    /// Width shared by all bins.
    pub fn bin_width(&self) -> F {
        (self.max - self.min) / F::from_usize(self.counts.len()).unwrap()
    }

    /// Edges of all bins, one more than there are bins.
    pub fn edges(&self) -> Vec<F> {
        let width = self.bin_width();
        (0..=self.counts.len())
            .map(|i| self.min + width * F::from_usize(i).unwrap())
            .collect()
    }

    /// Total number of values.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Visible area of a scatter chart.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    /// Range of the color index axis.
    pub color: [f64; 2],
    /// Range of the magnitude axis. It is drawn inverted, with bright stars at the top.
    pub magnitude: [f64; 2],
}

impl Default for Window {
    fn default() -> Self {
        Self {
            color: [-1., 2.5],
            magnitude: [26., 31.],
        }
    }
}

impl Window {
    pub(crate) fn is_valid(&self) -> bool {
        [self.color, self.magnitude]
            .iter()
            .all(|[lo, hi]| lo.is_finite() && hi.is_finite() && lo < hi)
    }
}

/// How matched pairs are presented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotMode {
    /// Color-magnitude diagram inside the given window.
    Scatter(Window),
    /// Distribution of the second image's magnitudes.
    Histogram(NonZeroUsize),
}

/// Data ready to be handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Plot<F> {
    /// Color-magnitude diagram.
    Scatter {
        /// The points.
        series: ColorMagnitude<F>,
        /// The visible area.
        window: Window,
    },
    /// Magnitude distribution.
    Histogram(Histogram<F>),
}

impl PlotMode {
    /// Map matched pairs to the series this mode displays.
    pub fn plot<F: Float>(&self, pairs: &[MatchedPair<F>]) -> Plot<F> {
        let series = ColorMagnitude::from_pairs(pairs);
        match *self {
            PlotMode::Scatter(window) => Plot::Scatter { series, window },
            PlotMode::Histogram(bins) => Plot::Histogram(Histogram::new(&series.magnitudes, bins)),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn bins(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn color_magnitude() {
        let pairs = [MatchedPair::new(27.5, 26.25), MatchedPair::new(28., 28.5)];
        let series = ColorMagnitude::from_pairs(&pairs);

        assert_eq!(series.magnitudes, vec![26.25, 28.5]);
        assert_eq!(series.colors, vec![1.25, -0.5]);
        assert_eq!(series.points().collect::<Vec<_>>(), vec![(1.25, 26.25), (-0.5, 28.5)]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn histogram() {
        let values = [0., 1., 2., 3., 4., 5., 6., 7., 8., 9., 10.];
        let hist = Histogram::new(&values, bins(5));

        assert_eq!(hist.min, 0.);
        assert_eq!(hist.max, 10.);
        assert_eq!(hist.counts, vec![2, 2, 2, 2, 3]);
        assert_eq!(hist.total(), values.len());
        assert_abs_diff_eq!(hist.bin_width(), 2., epsilon = 1e-12);
        assert_eq!(hist.edges(), vec![0., 2., 4., 6., 8., 10.]);
    }

    #[test]
    fn histogram_unsorted() {
        let values = [28.1, 26.0, 30.0, 27.9, 26.4];
        let hist = Histogram::new(&values, bins(2));

        assert_eq!(hist.counts, vec![3, 2]);
    }

    #[test]
    fn histogram_single_value() {
        let hist = Histogram::new(&[27., 27., 27.], bins(10));

        assert_eq!(hist.min, 26.5);
        assert_eq!(hist.max, 27.5);
        assert_eq!(hist.total(), 3);
        assert_eq!(hist.counts[5], 3);
    }

    #[test]
    fn histogram_empty() {
        let hist = Histogram::<f64>::new(&[], bins(4));

        assert_eq!((hist.min, hist.max), (0., 1.));
        assert_eq!(hist.counts, vec![0; 4]);
    }

    #[test]
    fn histogram_skips_non_finite() {
        let values = [27., f64::NAN, 29., f64::INFINITY, 28., f64::NEG_INFINITY];
        let hist = Histogram::new(&values, bins(2));

        assert_eq!((hist.min, hist.max), (27., 29.));
        assert_eq!(hist.counts, vec![1, 2]);
        assert_eq!(hist.total(), 3);
    }

    #[test]
    fn histogram_only_nan() {
        let hist = Histogram::new(&[f64::NAN, f64::NAN], bins(3));

        assert_eq!((hist.min, hist.max), (0., 1.));
        assert_eq!(hist.total(), 0);
    }

    #[test]
    fn window() {
        assert!(Window::default().is_valid());
        assert!(!Window {
            color: [1., 1.],
            magnitude: [26., 31.]
        }
        .is_valid());
        assert!(!Window {
            color: [-1., 2.5],
            magnitude: [f64::NAN, 31.]
        }
        .is_valid());
    }

    #[test]
    fn plot_modes() {
        let pairs = [
            MatchedPair::new(27.5, 26.25),
            MatchedPair::new(28., 28.5),
            MatchedPair::new(29., 28.),
        ];

        match PlotMode::Scatter(Window::default()).plot(&pairs) {
            Plot::Scatter { series, window } => {
                assert_eq!(series.len(), 3);
                assert_eq!(window, Window::default());
            }
            Plot::Histogram(_) => panic!("expected a scatter plot"),
        }

        match PlotMode::Histogram(bins(3)).plot(&pairs) {
            Plot::Histogram(hist) => {
                assert_eq!(hist.counts.len(), 3);
                assert_eq!(hist.total(), 3);
            }
            Plot::Scatter { .. } => panic!("expected a histogram"),
        }
    }
}
