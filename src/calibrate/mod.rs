//! Recalibration of data against a replacement calibrator model.
//!
//! Data that were calibrated with one model of the calibrator star can be
//! moved onto another model by multiplying each channel by the ratio of the
//! two models' predictions at that channel's UV point(s) and wavelength.

mod models;
#[cfg(test)]
mod tests;

pub use models::{GaussianDisk, PointSource};

use std::str::FromStr;

use itertools::izip;
use log::{debug, warn};
use thiserror::Error;

use crate::{c64, DataKind, OiRow, OiRowData, UvPoint};

/// A model of a calibrator, predicting the factor expected in each kind of
/// observable. Implementations must give the same answer for the same inputs.
pub trait Calibrator: Sync {
    /// The expected squared visibility for a baseline at a wavelength
    /// \[metres\].
    fn vis2(&self, uv: UvPoint, wavelength: f64) -> f64;

    /// The expected triple product for a closure triangle at a wavelength
    /// \[metres\].
    fn t3(&self, uv12: UvPoint, uv23: UvPoint, uv31: UvPoint, wavelength: f64) -> c64;
}

/// Should errors be rescaled along with data?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorScaling {
    /// Errors are left untouched; they are treated as independent of the
    /// calibrator.
    #[default]
    Unscaled,

    /// Squared-visibility errors and closure-phase amplitude errors are
    /// multiplied by the magnitude of the calibration ratio. Closure-phase
    /// phase errors are never changed.
    Scaled,
}

#[derive(Error, Debug)]
#[error("Unrecognised error scaling '{0}'; supported values are 'unscaled' and 'scaled'")]
pub struct ParseErrorScalingError(String);

impl FromStr for ErrorScaling {
    type Err = ParseErrorScalingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unscaled" => Ok(ErrorScaling::Unscaled),
            "scaled" => Ok(ErrorScaling::Scaled),
            _ => Err(ParseErrorScalingError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecalibrationOptions {
    pub error_scaling: ErrorScaling,
}

/// Recalibrate `rows` (which were calibrated against `old_cal`) against
/// `new_cal`. The returned rows are independent copies; `rows` is untouched.
/// Complex-visibility rows are copied unchanged.
///
/// Every channel is rescaled, whether or not it is masked.
pub fn recalibrate(
    rows: &[OiRow],
    old_cal: &dyn Calibrator,
    new_cal: &dyn Calibrator,
    options: RecalibrationOptions,
) -> Vec<OiRow> {
    let mut output = rows.to_vec();
    let mut num_recalibrated = 0;
    for row in output.iter_mut() {
        match row.kind() {
            DataKind::Vis2 => recalibrate_vis2(row, old_cal, new_cal, options),
            DataKind::T3 => recalibrate_t3(row, old_cal, new_cal, options),
            DataKind::Vis => continue,
        }
        num_recalibrated += 1;
    }
    debug!(
        "Recalibrated {num_recalibrated} of {} rows ({:?} errors)",
        rows.len(),
        options.error_scaling
    );

    output
}

/// Recalibrate a squared-visibility row in place. Rows of any other kind are
/// left alone.
pub fn recalibrate_vis2(
    row: &mut OiRow,
    old_cal: &dyn Calibrator,
    new_cal: &dyn Calibrator,
    options: RecalibrationOptions,
) {
    let (meta, data) = row.parts_mut();
    let (uv, data, data_err) = match data {
        OiRowData::Vis2 {
            uv, data, data_err, ..
        } => (*uv, data, data_err),
        _ => return,
    };

    let mut num_non_finite = 0;
    for (d, e, &wavelength) in izip!(
        data.iter_mut(),
        data_err.iter_mut(),
        meta.wavelength.eff_wave.iter()
    ) {
        let ratio = old_cal.vis2(uv, wavelength) / new_cal.vis2(uv, wavelength);
        if !ratio.is_finite() {
            num_non_finite += 1;
        }
        *d *= ratio;
        if options.error_scaling == ErrorScaling::Scaled {
            *e *= ratio.abs();
        }
    }

    if num_non_finite > 0 {
        warn!("{num_non_finite} squared-visibility channels got a non-finite calibration ratio");
    }
}

/// Recalibrate a closure-phase row in place. Rows of any other kind are left
/// alone.
pub fn recalibrate_t3(
    row: &mut OiRow,
    old_cal: &dyn Calibrator,
    new_cal: &dyn Calibrator,
    options: RecalibrationOptions,
) {
    let (meta, data) = row.parts_mut();
    let ([uv12, uv23, uv31], data, data_err) = match data {
        OiRowData::T3 {
            uv, data, data_err, ..
        } => (*uv, data, data_err),
        _ => return,
    };

    let mut num_non_finite = 0;
    for (d, e, &wavelength) in izip!(
        data.iter_mut(),
        data_err.iter_mut(),
        meta.wavelength.eff_wave.iter()
    ) {
        let ratio = old_cal.t3(uv12, uv23, uv31, wavelength)
            / new_cal.t3(uv12, uv23, uv31, wavelength);
        if !ratio.is_finite() {
            num_non_finite += 1;
        }
        *d *= ratio;
        if options.error_scaling == ErrorScaling::Scaled {
            e.re *= ratio.norm();
        }
    }

    if num_non_finite > 0 {
        warn!("{num_non_finite} closure-phase channels got a non-finite calibration ratio");
    }
}
