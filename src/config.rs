//! Run configuration read from a TOML file.
//!
//! ```toml
//! max_dist = 3.0
//! plot_histogram = false
//! histogram_bin = 10
//! output = "cmd.png"
//!
//! [window]
//! color = [-1.0, 2.5]
//! magnitude = [26.0, 31.0]
//!
//! [catalogs.a]
//! path = "28.csv"
//! calibration = { psf_to_aperture = 0.1516, aperture_correction = 0.916, instrumental_zero_point = 18.371, reference_zero_point = 26.403 }
//!
//! [catalogs.b]
//! path = "29.csv"
//! columns = { x = 1, y = 2, magnitude = 3 }
//! calibration = { psf_to_aperture = 0.1416, aperture_correction = 0.914, instrumental_zero_point = 17.875, reference_zero_point = 25.507 }
//! ```
//!
//! Only the two catalogs are required. Their calibration constants have no defaults.

use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::calibration::CalibrationConstants;
use crate::catalog::ColumnLayout;
use crate::error::{Error, Result};
use crate::matching::DEFAULT_MAX_DIST;
use crate::presentation::{PlotMode, Window};

/// Identifies one of the two catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogId {
    /// The catalog whose detections look for counterparts.
    A,
    /// The catalog the counterparts are taken from.
    B,
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogId::A => write!(f, "a"),
            CatalogId::B => write!(f, "b"),
        }
    }
}

/// Source table and calibration of one catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Table to read the detections from.
    pub path: PathBuf,
    /// Columns holding position and magnitude.
    #[serde(default)]
    pub columns: ColumnLayout,
    /// Photometric constants of the image.
    pub calibration: CalibrationConstants<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Catalogs {
    a: CatalogConfig,
    b: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_max_dist")]
    max_dist: f64,
    #[serde(default)]
    plot_histogram: bool,
    #[serde(default = "default_histogram_bin")]
    histogram_bin: usize,
    #[serde(default)]
    window: Window,
    #[serde(default = "default_output")]
    output: PathBuf,
    #[serde(default)]
    accelerate: bool,
    catalogs: Catalogs,
}

fn default_max_dist() -> f64 {
    DEFAULT_MAX_DIST
}

fn default_histogram_bin() -> usize {
    10
}

fn default_output() -> PathBuf {
    PathBuf::from("cmd.png")
}

/// Validated configuration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum distance in pixels at which two detections count as the same star.
    pub max_dist: f64,
    /// What to draw.
    pub plot: PlotMode,
    /// Where to write the chart.
    pub output: PathBuf,
    /// Whether to search counterparts with a k-d tree instead of a full scan.
    pub accelerate: bool,
    catalog_a: CatalogConfig,
    catalog_b: CatalogConfig,
}

impl Config {
    /// Read and validate a configuration file.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config: Config = content.parse()?;

        if let Some(base) = path.parent() {
            for catalog in [&mut config.catalog_a, &mut config.catalog_b] {
                if catalog.path.is_relative() {
                    catalog.path = base.join(&catalog.path);
                }
            }
            if config.output.is_relative() {
                config.output = base.join(&config.output);
            }
        }
        Ok(config)
    }

    /// Source and calibration of the catalog `id`.
    pub fn catalog(&self, id: CatalogId) -> &CatalogConfig {
        match id {
            CatalogId::A => &self.catalog_a,
            CatalogId::B => &self.catalog_b,
        }
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        if !raw.max_dist.is_finite() || raw.max_dist < 0. {
            return Err(Error::Config(format!(
                "max_dist must be a non-negative number of pixels, got {}",
                raw.max_dist
            )));
        }

        let bins = NonZeroUsize::new(raw.histogram_bin)
            .ok_or_else(|| Error::Config("histogram_bin must be at least 1".to_string()))?;
        let plot = if raw.plot_histogram {
            PlotMode::Histogram(bins)
        } else {
            if !raw.window.is_valid() {
                return Err(Error::Config(format!(
                    "window ranges must be finite and increasing, got {:?}",
                    raw.window
                )));
            }
            PlotMode::Scatter(raw.window)
        };

        for (id, catalog) in [(CatalogId::A, &raw.catalogs.a), (CatalogId::B, &raw.catalogs.b)] {
            if !catalog.columns.is_distinct() {
                return Err(Error::Config(format!(
                    "catalog {id}: x, y and magnitude must be read from different columns"
                )));
            }
            let c = &catalog.calibration;
            let constants = [
                c.psf_to_aperture,
                c.aperture_correction,
                c.instrumental_zero_point,
                c.reference_zero_point,
            ];
            if constants.iter().any(|k| !k.is_finite()) {
                return Err(Error::Config(format!(
                    "catalog {id}: calibration constants must be finite"
                )));
            }
        }

        Ok(Self {
            max_dist: raw.max_dist,
            plot,
            output: raw.output,
            accelerate: raw.accelerate,
            catalog_a: raw.catalogs.a,
            catalog_b: raw.catalogs.b,
        })
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(s)?;
        Self::validate(raw)
    }
}
