#![warn(missing_docs)]

//! Photometric cross-matching of two star catalogs taken through different filters. \
//! Every detection of the first catalog is paired with the closest detection of the second one,
//! both magnitudes are calibrated to a standard photometric system, and the result is turned into
//! a color-magnitude diagram or a magnitude histogram.
//!
//! ## Interface
//! The central struct of this library is [`Matcher`]. It holds the two calibrated catalogs
//! and the maximum match distance, and yields the [`MatchedPair`]s.
//! In most cases, it should be created with [`Matcher::brute_force()`] or [`Matcher::kd_tree()`],
//! but for generic contexts, the search can be specified in [`Matcher::new()`].
//! Additional parameters are set via `Matcher::with_*()` functions.
//!
//! Example:
//! ```rust
//! use photomatch::{calibrate, CalibrationConstants, Catalog, Matcher};
//!
//! let mut a: Catalog<f64> = [(10., 12., 20.0)].into_iter().collect();
//! let mut b: Catalog<f64> = [(11., 12., 19.5), (40., 3., 18.2)].into_iter().collect();
//! calibrate(&mut a, &CalibrationConstants::new(0.1516, 0.916, 18.371, 26.403));
//! calibrate(&mut b, &CalibrationConstants::new(0.1416, 0.914, 17.875, 25.507));
//!
//! let pairs = Matcher::brute_force(&a, &b).with_max_dist(3.).pairs();
//! assert_eq!(pairs.len(), 1);
//! ```
//!
//! A whole run, from the configuration file to the chart, is [`analyze`] followed by [`render`].
//!
//! ## Parameters
//! - `max_dist`: Maximum Euclidean distance in pixels between two detections that are still
//!     counted as the same star. The bound is inclusive.
//! - Calibration constants: see [`CalibrationConstants`]. Each catalog has its own set.
//!
//! ## Matching policy
//! The closest detection wins; among equally close detections, the one that comes first in the
//! second catalog. A detection of the second catalog may be the counterpart of several
//! detections of the first one.

pub mod calibration;
pub mod catalog;
pub mod config;
pub mod error;
pub(crate) mod geometry;
pub mod matching;
pub mod pipeline;
pub mod presentation;
pub mod render;

pub use calibration::{calibrate, CalibrationConstants};
pub use catalog::{Catalog, ColumnLayout, Detection};
pub use config::{CatalogId, Config};
pub use error::{Error, Result};
pub use matching::{
    count_cross_match, cross_match, BruteForce, KdTreeIndex, MatchReport, MatchedPair, Matcher,
    NearestNeighbor,
};
pub use pipeline::{analyze, Analysis};
pub use presentation::{ColorMagnitude, Histogram, Plot, PlotMode, Window};
pub use render::render;

/// A generic float trait such that matching and calibration are generic over `f32`/`f64`.
///
/// This trait is automatically implemented for all types implementing the supertraits.
/// Particularly, this includes `f32` and `f64`.
/// [`num_traits::Float`] is not a supertrait as the need to specify the provider of the redundant definitions of the basic math functions would clutter the code.
pub trait Float:
    Copy + Default + nalgebra::RealField + num_traits::FromPrimitive + num_traits::ToPrimitive
{
}

impl<F> Float for F where
    F: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive + num_traits::ToPrimitive
{
}
