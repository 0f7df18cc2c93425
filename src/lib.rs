//! Bootstrap resampling and recalibration of optical-interferometry
//! observables (complex visibilities, squared visibilities and closure
//! phases).

pub mod bootstrap;
pub mod calibrate;
pub mod filter;
pub mod row;
pub mod simulate;

#[cfg(test)]
pub(crate) mod test_util;

use std::fmt::Display;

pub use num_complex::Complex64 as c64;
use vec1::Vec1;

pub use row::{OiRow, OiRowData, RowError, RowMeta, RowValues, UvPoint};

/// The kinds of observation rows. These mirror the OIFITS data tables that
/// they're normally read from (OI_VIS, OI_VIS2 and OI_T3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    /// Complex visibilities.
    Vis,

    /// Squared visibilities.
    Vis2,

    /// Closure phases (triple products).
    T3,
}

impl DataKind {
    /// All kinds, in the order that resampling handles them.
    pub const ALL: [DataKind; 3] = [DataKind::Vis, DataKind::Vis2, DataKind::T3];

    /// The number of stations (and therefore UV points) that contribute to a
    /// row of this kind.
    pub fn num_stations(self) -> usize {
        match self {
            DataKind::Vis | DataKind::Vis2 => 2,
            DataKind::T3 => 3,
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            DataKind::Vis => "OI_VIS",
            DataKind::Vis2 => "OI_VIS2",
            DataKind::T3 => "OI_T3",
        })
    }
}

/// An observed target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OiTarget {
    /// The index that data rows use to refer to this target.
    pub target_id: i32,

    /// The target's name.
    pub name: String,

    /// Right ascension at the mean equinox \[degrees\].
    pub ra: f64,

    /// Declination at the mean equinox \[degrees\].
    pub dec: f64,

    /// The equinox of `ra` and `dec` \[years\].
    pub equinox: f64,

    pub ra_err: f64,
    pub dec_err: f64,

    /// Systemic radial velocity \[m/s\].
    pub sysvel: f64,
    pub veltyp: String,
    pub veldef: String,

    /// Proper motion in RA \[degrees/year\].
    pub pmra: f64,

    /// Proper motion in Dec \[degrees/year\].
    pub pmdec: f64,
    pub pmra_err: f64,
    pub pmdec_err: f64,

    /// \[degrees\]
    pub parallax: f64,
    pub para_err: f64,

    pub spectyp: String,
}

/// A single station (telescope position) within an [`OiArray`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OiStation {
    pub tel_name: String,
    pub sta_name: String,

    /// The index that data rows use to refer to this station.
    pub sta_index: i32,

    /// The telescope's diameter \[metres\].
    pub diameter: f64,

    /// The station's position relative to the array centre \[metres\].
    pub staxyz: [f64; 3],
}

/// The telescope array that produced some data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OiArray {
    pub arrname: String,

    /// The coordinate frame of `array_xyz` (normally "GEOCENTRIC").
    pub frame: String,

    /// The array centre \[metres\].
    pub array_xyz: [f64; 3],

    pub stations: Vec<OiStation>,
}

/// The spectral channels of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct OiWavelength {
    pub insname: String,

    /// The effective wavelength of each channel \[metres\].
    pub eff_wave: Vec1<f64>,

    /// The effective bandwidth of each channel \[metres\].
    pub eff_band: Vec1<f64>,
}

impl OiWavelength {
    pub fn num_channels(&self) -> usize {
        self.eff_wave.len()
    }
}
