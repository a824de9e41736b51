//! Nearest-neighbor matching between two catalogs and main interface.

use itertools::Itertools;
use kiddo::float::{distance::SquaredEuclidean, kdtree::KdTree};
use log::{debug, info};
use nalgebra::Vector2;

use crate::catalog::Catalog;
use crate::geometry::{distance, round_to};
use crate::Float;

/// Decimal places kept in matched magnitudes.
const MAGNITUDE_DECIMALS: i32 = 3;

/// Match distance used when none is given, in pixels.
pub const DEFAULT_MAX_DIST: f64 = 3.;

/// Calibrated magnitudes of one star as seen in both images.
///
/// Both magnitudes are rounded to three decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair<F> {
    /// Magnitude in the first image.
    pub magnitude_a: F,
    /// Magnitude in the second image.
    pub magnitude_b: F,
}

impl<F: Float> MatchedPair<F> {
    /// Create a new pair.
    pub fn new(magnitude_a: F, magnitude_b: F) -> Self {
        Self {
            magnitude_a,
            magnitude_b,
        }
    }

    /// Color index, i.e. the first magnitude minus the second.
    pub fn color(&self) -> F {
        self.magnitude_a - self.magnitude_b
    }
}

/// Indices of a matched pair of detections and their separation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<F> {
    /// Index into the first catalog.
    pub index_a: usize,
    /// Index into the second catalog.
    pub index_b: usize,
    /// Euclidean distance in pixels.
    pub distance: F,
}

/// A detection found by a [`NearestNeighbor`] search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<F> {
    /// Index into the searched catalog.
    pub index: usize,
    /// Euclidean distance to the query point.
    pub distance: F,
}

/// Summary of a matching run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchReport<F> {
    /// Number of detections in the first catalog.
    pub candidates: usize,
    /// Number of detections that found a counterpart.
    pub matched: usize,
    /// Mean separation of the matched detections, `None` if nothing matched.
    pub mean_distance: Option<F>,
}

impl<F: Float> MatchReport<F> {
    fn from_matches(candidates: usize, matches: &[Match<F>]) -> Self {
        let mean_distance = (!matches.is_empty()).then(|| {
            let sum = matches.iter().fold(F::zero(), |acc, m| acc + m.distance);
            sum / F::from_usize(matches.len()).unwrap()
        });
        Self {
            candidates,
            matched: matches.len(),
            mean_distance,
        }
    }

    /// Number of detections left without a counterpart.
    pub fn unmatched(&self) -> usize {
        self.candidates - self.matched
    }
}

/// Generalizes over ways of finding the closest detection of a catalog.
///
/// Every implementation must return exactly what an exhaustive scan in catalog order would:
/// the detection with the smallest Euclidean distance, the earliest one among equally close
/// detections, and nothing if that distance exceeds `max_dist`.
pub trait NearestNeighbor<'a, F: Float>: Sized {
    /// Prepare the search over `catalog`.
    fn build(catalog: &'a Catalog<F>) -> Self;

    /// The searched catalog.
    fn catalog(&self) -> &'a Catalog<F>;

    /// Find the detection closest to `point`, if it lies within `max_dist` (inclusive).
    fn nearest_within(&self, point: &Vector2<F>, max_dist: F) -> Option<Neighbor<F>>;
}

/// Scan `indices` in the given order and keep the first strictly closest detection.
fn closest<F: Float>(
    catalog: &Catalog<F>,
    point: &Vector2<F>,
    indices: impl IntoIterator<Item = usize>,
) -> Option<Neighbor<F>> {
    let mut best: Option<Neighbor<F>> = None;
    for index in indices {
        let d = distance(point, &catalog[index].position);
        if best.is_none_or(|b| d < b.distance) {
            best = Some(Neighbor { index, distance: d });
        }
    }
    best
}

/// Exhaustive pairwise search.
#[derive(Clone, Debug)]
pub struct BruteForce<'a, F: Float> {
    catalog: &'a Catalog<F>,
}

impl<'a, F: Float> NearestNeighbor<'a, F> for BruteForce<'a, F> {
    fn build(catalog: &'a Catalog<F>) -> Self {
        Self { catalog }
    }

    fn catalog(&self) -> &'a Catalog<F> {
        self.catalog
    }

    fn nearest_within(&self, point: &Vector2<F>, max_dist: F) -> Option<Neighbor<F>> {
        closest(self.catalog, point, 0..self.catalog.len()).filter(|n| n.distance <= max_dist)
    }
}

/// Search accelerated by a k-d tree over the catalog positions.
///
/// The tree only narrows down the candidates inside a slightly enlarged radius;
/// distances and tie breaking are then evaluated exactly as in [`BruteForce`].
/// Every distinct position enters the tree once, together with all detections found there.
pub struct KdTreeIndex<'a, F: Float + num_traits::float::FloatCore> {
    catalog: &'a Catalog<F>,
    tree: KdTree<F, usize, 2, 32, u32>,
    /// Catalog indices sharing one position, in catalog order.
    sites: Vec<Vec<usize>>,
}

impl<'a, F> NearestNeighbor<'a, F> for KdTreeIndex<'a, F>
where
    F: Default + Float + num_traits::float::FloatCore,
{
    fn build(catalog: &'a Catalog<F>) -> Self {
        let key = |i: usize| {
            let p = &catalog[i].position;
            [p[0], p[1]].map(|v| v.to_f64().unwrap_or(f64::NAN))
        };
        // stable, so indices at one position stay in catalog order
        let by_position = (0..catalog.len()).sorted_by(|&i, &j| {
            let (p, q) = (key(i), key(j));
            p[0].total_cmp(&q[0]).then(p[1].total_cmp(&q[1]))
        });

        let mut sites: Vec<Vec<usize>> = Vec::new();
        for index in by_position {
            match sites.last_mut() {
                Some(site) if catalog[site[0]].position == catalog[index].position => {
                    site.push(index)
                }
                _ => sites.push(vec![index]),
            }
        }

        let tree: KdTree<F, usize, 2, 32, u32> = sites
            .iter()
            .enumerate()
            .map(|(s, site)| {
                let p = &catalog[site[0]].position;
                ([p[0], p[1]], s)
            })
            .collect();
        Self {
            catalog,
            tree,
            sites,
        }
    }

    fn catalog(&self) -> &'a Catalog<F> {
        self.catalog
    }

    fn nearest_within(&self, point: &Vector2<F>, max_dist: F) -> Option<Neighbor<F>> {
        if self.catalog.is_empty() || max_dist < F::zero() {
            return None;
        }
        // squared distances from the tree may differ from the exact ones in the last bits
        let radius = max_dist * max_dist;
        let radius = radius
            + radius * F::from_f64(1e-6).unwrap()
            + F::from_f64(1e-12).unwrap();

        let candidates = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&[point[0], point[1]], radius)
            .into_iter()
            .flat_map(|n| self.sites[n.item].iter().copied())
            .sorted_unstable();

        closest(self.catalog, point, candidates).filter(|n| n.distance <= max_dist)
    }
}

/// The central struct of this library.
///
/// Holds the two calibrated catalogs, the search structure over the second one and the
/// maximum match distance. Use [`Matcher::brute_force`] for the plain pairwise comparison or
/// [`Matcher::kd_tree`] for the accelerated search; both yield identical results.
///
/// Example:
/// ```rust
/// use photomatch::{Catalog, Matcher, MatchedPair};
///
/// let a: Catalog<f64> = [(0., 0., 10.)].into_iter().collect();
/// let b: Catalog<f64> = [(1., 0., 9.), (0., 0.5, 9.5)].into_iter().collect();
///
/// let pairs = Matcher::brute_force(&a, &b).with_max_dist(2.).pairs();
/// assert_eq!(pairs, vec![MatchedPair::new(10., 9.5)]);
/// ```
#[derive(Clone, Debug)]
pub struct Matcher<'a, F: Float, N> {
    /// Detections looking for a counterpart.
    catalog_a: &'a Catalog<F>,
    /// Search over the detections that may be matched.
    index: N,
    /// Maximum accepted distance in pixels.
    max_dist: F,
}

impl<'a, F: Float> Matcher<'a, F, BruteForce<'a, F>> {
    /// Match by exhaustive pairwise comparison.
    pub fn brute_force(catalog_a: &'a Catalog<F>, catalog_b: &'a Catalog<F>) -> Self {
        Self::new(catalog_a, catalog_b)
    }
}

impl<'a, F> Matcher<'a, F, KdTreeIndex<'a, F>>
where
    F: Default + Float + num_traits::float::FloatCore,
{
    /// Match using a k-d tree built over `catalog_b`.
    pub fn kd_tree(catalog_a: &'a Catalog<F>, catalog_b: &'a Catalog<F>) -> Self {
        Self::new(catalog_a, catalog_b)
    }
}

impl<'a, F, N> Matcher<'a, F, N>
where
    F: Float,
    N: NearestNeighbor<'a, F>,
{
    /// Create a new instance using a generic [`NearestNeighbor`] search and the default distance.
    pub fn new(catalog_a: &'a Catalog<F>, catalog_b: &'a Catalog<F>) -> Self {
        Self {
            catalog_a,
            index: N::build(catalog_b),
            max_dist: F::from_f64(DEFAULT_MAX_DIST).unwrap(),
        }
    }

    /// Set the maximum match distance.
    pub fn with_max_dist(mut self, max_dist: F) -> Self {
        self.max_dist = max_dist;
        self
    }

    /// Find the closest counterpart of every detection of the first catalog.
    ///
    /// Matches follow the order of the first catalog. A detection of the second catalog may be
    /// the counterpart of several detections of the first one.
    pub fn matches(&self) -> Vec<Match<F>> {
        info!(
            "Matching {} detections within {} px.",
            self.catalog_a.len(),
            self.max_dist
        );
        self.catalog_a
            .iter()
            .enumerate()
            .filter_map(|(index_a, a)| self.match_one(index_a, &a.position))
            .collect()
    }

    fn match_one(&self, index_a: usize, position: &Vector2<F>) -> Option<Match<F>> {
        self.index
            .nearest_within(position, self.max_dist)
            .map(|n| Match {
                index_a,
                index_b: n.index,
                distance: n.distance,
            })
    }

    /// Matched magnitudes, rounded to three decimal places.
    pub fn pairs(&self) -> Vec<MatchedPair<F>> {
        self.to_pairs(&self.matches())
    }

    /// Matched magnitudes together with a summary of the run.
    pub fn match_with_report(&self) -> (Vec<MatchedPair<F>>, MatchReport<F>) {
        self.summarize(&self.matches())
    }

    fn summarize(&self, matches: &[Match<F>]) -> (Vec<MatchedPair<F>>, MatchReport<F>) {
        let report = MatchReport::from_matches(self.catalog_a.len(), matches);
        debug!(
            "Matched {} of {} detections, {} without counterpart.",
            report.matched,
            report.candidates,
            report.unmatched()
        );
        (self.to_pairs(matches), report)
    }

    fn to_pairs(&self, matches: &[Match<F>]) -> Vec<MatchedPair<F>> {
        matches
            .iter()
            .map(|m| {
                MatchedPair::new(
                    round_to(self.catalog_a[m.index_a].magnitude, MAGNITUDE_DECIMALS),
                    round_to(self.index.catalog()[m.index_b].magnitude, MAGNITUDE_DECIMALS),
                )
            })
            .collect()
    }
}

/// Count the detections of `catalog_a` that have a counterpart in `catalog_b` within `max_dist`.
///
/// # Example:
/// ```
/// # use photomatch::{count_cross_match, Catalog};
/// let a: Catalog<f64> = [(1., 2., 20.), (3., 4., 20.), (5., 6., 20.)].into_iter().collect();
/// let b: Catalog<f64> = [(1., 2., 21.), (3., 4., 21.), (6., 7., 21.), (8., 9., 21.)].into_iter().collect();
/// assert_eq!(count_cross_match(&a, &b, 0.), 2)
/// ```
pub fn count_cross_match<F: Float>(
    catalog_a: &Catalog<F>,
    catalog_b: &Catalog<F>,
    max_dist: F,
) -> usize {
    Matcher::brute_force(catalog_a, catalog_b)
        .with_max_dist(max_dist)
        .matches()
        .len()
}

/// Match two calibrated catalogs by exhaustive nearest-neighbor search.
///
/// # Example:
/// ```
/// # use photomatch::{cross_match, Catalog, MatchedPair};
/// let a: Catalog<f64> = [(3., 4., 20.), (1., 2., 21.), (5., 6., 22.)].into_iter().collect();
/// let b: Catalog<f64> = [(1., 2., 19.), (3., 4., 18.), (6., 7., 17.)].into_iter().collect();
/// assert_eq!(
///     cross_match(&a, &b, 10.),
///     vec![MatchedPair::new(20., 18.), MatchedPair::new(21., 19.), MatchedPair::new(22., 17.)]
/// )
/// ```
pub fn cross_match<F: Float>(
    catalog_a: &Catalog<F>,
    catalog_b: &Catalog<F>,
    max_dist: F,
) -> Vec<MatchedPair<F>> {
    Matcher::brute_force(catalog_a, catalog_b)
        .with_max_dist(max_dist)
        .pairs()
}

#[cfg(feature = "parallel")]
pub use parallel::*;

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;
    use rayon::prelude::*;

    impl<'a, F, N> Matcher<'a, F, N>
    where
        F: Float,
        N: NearestNeighbor<'a, F> + Sync,
    {
        /// Find the closest counterparts in parallel.
        ///
        /// The result is identical to [`matches`](Matcher::matches()), in the same order.
        pub fn matches_par(&self) -> Vec<Match<F>> {
            info!(
                "Matching {} detections within {} px in parallel.",
                self.catalog_a.len(),
                self.max_dist
            );
            self.catalog_a
                .par_iter()
                .enumerate()
                .filter_map(|(index_a, a)| self.match_one(index_a, &a.position))
                .collect()
        }

        /// Matched magnitudes computed in parallel.
        ///
        /// Also see [`pairs`](Matcher::pairs()).
        pub fn pairs_par(&self) -> Vec<MatchedPair<F>> {
            self.to_pairs(&self.matches_par())
        }

        /// Matched magnitudes and run summary computed in parallel.
        ///
        /// Also see [`match_with_report`](Matcher::match_with_report()).
        pub fn match_with_report_par(&self) -> (Vec<MatchedPair<F>>, MatchReport<F>) {
            self.summarize(&self.matches_par())
        }
    }
}
