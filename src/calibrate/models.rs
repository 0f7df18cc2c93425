//! Simple analytic calibrator models.

use std::f64::consts::{LN_2, PI};

use super::Calibrator;
use crate::{c64, UvPoint};

/// Milliarcseconds to radians.
const MAS_TO_RAD: f64 = PI / (180.0 * 3600.0 * 1000.0);

/// An unresolved calibrator. Every prediction is 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointSource;

impl Calibrator for PointSource {
    fn vis2(&self, _uv: UvPoint, _wavelength: f64) -> f64 {
        1.0
    }

    fn t3(&self, _uv12: UvPoint, _uv23: UvPoint, _uv31: UvPoint, _wavelength: f64) -> c64 {
        c64::new(1.0, 0.0)
    }
}

/// A circularly-symmetric Gaussian brightness distribution.
#[derive(Debug, Clone, Copy)]
pub struct GaussianDisk {
    /// Full width at half maximum \[radians\].
    pub fwhm: f64,
}

impl GaussianDisk {
    pub fn new(fwhm_rad: f64) -> GaussianDisk {
        GaussianDisk { fwhm: fwhm_rad }
    }

    /// Make a disk with a FWHM given in milliarcseconds.
    pub fn from_mas(fwhm_mas: f64) -> GaussianDisk {
        GaussianDisk::new(fwhm_mas * MAS_TO_RAD)
    }

    /// The (real, normalised) visibility on a baseline.
    pub fn visibility(&self, uv: UvPoint, wavelength: f64) -> f64 {
        let x = PI * self.fwhm * uv.length() / wavelength;
        (-x * x / (4.0 * LN_2)).exp()
    }
}

impl Calibrator for GaussianDisk {
    fn vis2(&self, uv: UvPoint, wavelength: f64) -> f64 {
        self.visibility(uv, wavelength).powi(2)
    }

    fn t3(&self, uv12: UvPoint, uv23: UvPoint, uv31: UvPoint, wavelength: f64) -> c64 {
        // Symmetric sources have real visibilities, so a zero closure phase.
        let t3 = self.visibility(uv12, wavelength)
            * self.visibility(uv23, wavelength)
            * self.visibility(uv31, wavelength);
        c64::new(t3, 0.0)
    }
}
