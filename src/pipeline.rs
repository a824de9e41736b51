//! One full run: load, calibrate, match, map for presentation.

use log::{debug, info};

use crate::calibration::calibrate;
use crate::catalog::Catalog;
use crate::config::{CatalogId, Config};
use crate::error::Result;
use crate::matching::{MatchReport, MatchedPair, Matcher, NearestNeighbor};
use crate::presentation::Plot;

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Matched calibrated magnitudes, in the order of the first catalog.
    pub pairs: Vec<MatchedPair<f64>>,
    /// Summary of the matching.
    pub report: MatchReport<f64>,
    /// Series ready for rendering.
    pub plot: Plot<f64>,
}

/// Read the catalog `id` and calibrate its magnitudes.
pub fn load_calibrated(config: &Config, id: CatalogId) -> Result<Catalog<f64>> {
    let source = config.catalog(id);
    let mut catalog = Catalog::from_path(&source.path, source.columns)?;
    debug!("Calibrating catalog {id} with {:?}.", source.calibration);
    calibrate(&mut catalog, &source.calibration);
    Ok(catalog)
}

/// Run the analysis described by `config`.
///
/// Both catalogs are read before anything is computed, so a malformed input aborts the run
/// without partial results.
pub fn analyze(config: &Config) -> Result<Analysis> {
    let catalog_a = load_calibrated(config, CatalogId::A)?;
    let catalog_b = load_calibrated(config, CatalogId::B)?;

    let (pairs, report) = if config.accelerate {
        summarize(Matcher::kd_tree(&catalog_a, &catalog_b).with_max_dist(config.max_dist))
    } else {
        summarize(Matcher::brute_force(&catalog_a, &catalog_b).with_max_dist(config.max_dist))
    };

    info!(
        "Matched {} of {} stars within {} px.",
        report.matched, report.candidates, config.max_dist
    );
    if let Some(mean) = report.mean_distance {
        debug!("Mean match distance {mean:.3} px.");
    }

    let plot = config.plot.plot(&pairs);
    Ok(Analysis {
        pairs,
        report,
        plot,
    })
}

#[cfg(not(feature = "parallel"))]
fn summarize<'a, N>(matcher: Matcher<'a, f64, N>) -> (Vec<MatchedPair<f64>>, MatchReport<f64>)
where
    N: NearestNeighbor<'a, f64>,
{
    matcher.match_with_report()
}

#[cfg(feature = "parallel")]
fn summarize<'a, N>(matcher: Matcher<'a, f64, N>) -> (Vec<MatchedPair<f64>>, MatchReport<f64>)
where
    N: NearestNeighbor<'a, f64> + Sync,
{
    matcher.match_with_report_par()
}
