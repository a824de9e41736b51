//! Conversion of instrumental PSF magnitudes into calibrated apparent magnitudes.

use log::info;
use serde::Deserialize;

use crate::catalog::Catalog;
use crate::Float;

/// Photometric constants of one image.
///
/// Applied in field order:
/// 1. `psf_to_aperture` is added, turning the PSF-fit magnitude into a small-aperture magnitude.
/// 2. `aperture_correction` scales the result to an effectively infinite aperture.
/// 3. `instrumental_zero_point` is subtracted.
/// 4. `reference_zero_point` of the standard system is added.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationConstants<F> {
    /// Mean PSF to aperture magnitude offset.
    pub psf_to_aperture: F,
    /// Share of the total flux caught by the measuring aperture.
    pub aperture_correction: F,
    /// Magnitude at which the detector records one electron per second.
    pub instrumental_zero_point: F,
    /// Apparent magnitude of a source yielding one electron per second.
    pub reference_zero_point: F,
}

impl<F: Float> CalibrationConstants<F> {
    /// Create constants from the four correction terms, in the order they are applied.
    pub fn new(
        psf_to_aperture: F,
        aperture_correction: F,
        instrumental_zero_point: F,
        reference_zero_point: F,
    ) -> Self {
        Self {
            psf_to_aperture,
            aperture_correction,
            instrumental_zero_point,
            reference_zero_point,
        }
    }

    /// Constants that leave every magnitude unchanged.
    pub fn identity() -> Self {
        Self::new(F::zero(), F::one(), F::zero(), F::zero())
    }

    /// Calibrate a single instrumental magnitude.
    pub fn apply(&self, magnitude: F) -> F {
        (magnitude + self.psf_to_aperture) * self.aperture_correction
            - self.instrumental_zero_point
            + self.reference_zero_point
    }
}

/// Calibrate every detection of `catalog` in place.
pub fn calibrate<F: Float>(catalog: &mut Catalog<F>, constants: &CalibrationConstants<F>) {
    for detection in catalog.detections_mut() {
        detection.magnitude = constants.apply(detection.magnitude);
    }
    info!("Calibrated {} magnitudes.", catalog.len());
}
