//! Observation rows: one measurement (per spectral channel) of one baseline or
//! closure triangle at one time.

mod error;

pub use error::RowError;

use std::{
    ops::{Add, Neg},
    sync::Arc,
};

use hifitime::{Duration, Epoch};
use log::trace;
use ndarray::prelude::*;
use rand::Rng;

use crate::{c64, DataKind, OiArray, OiTarget, OiWavelength};

/// A spatial-frequency coordinate of a single baseline \[metres\]. Divide by a
/// wavelength to get the coordinate in wavelengths.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvPoint {
    pub u: f64,
    pub v: f64,
}

impl UvPoint {
    pub fn new(u: f64, v: f64) -> UvPoint {
        UvPoint { u, v }
    }

    /// The projected baseline length \[metres\].
    pub fn length(self) -> f64 {
        self.u.hypot(self.v)
    }
}

impl Add for UvPoint {
    type Output = UvPoint;

    fn add(self, rhs: UvPoint) -> UvPoint {
        UvPoint {
            u: self.u + rhs.u,
            v: self.v + rhs.v,
        }
    }
}

impl Neg for UvPoint {
    type Output = UvPoint;

    fn neg(self) -> UvPoint {
        UvPoint {
            u: -self.u,
            v: -self.v,
        }
    }
}

/// Metadata common to all kinds of rows.
#[derive(Debug, Clone)]
pub struct RowMeta {
    /// The observed target. Many rows may share a single target.
    pub target: Arc<OiTarget>,

    /// The array that made the observation.
    pub array: Arc<OiArray>,

    /// The spectral channels of the instrument. The number of channels here
    /// dictates the length of all per-channel arrays in the row.
    pub wavelength: Arc<OiWavelength>,

    /// UTC time of the observation \[seconds\].
    pub time: f64,

    /// The time of the observation.
    pub mjd: Epoch,

    pub int_time: Duration,
}

/// The kind-specific contents of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum OiRowData {
    Vis {
        sta_index: [i32; 2],
        uv: UvPoint,
        data: Array1<c64>,
        data_err: Array1<c64>,
    },

    Vis2 {
        sta_index: [i32; 2],
        uv: UvPoint,
        data: Array1<f64>,
        data_err: Array1<f64>,
    },

    /// A closure triangle. The UV points are ordered (uv12, uv23, uv31); the
    /// errors hold the amplitude error in the real part and the phase error
    /// \[radians\] in the imaginary part.
    T3 {
        sta_index: [i32; 3],
        uv: [UvPoint; 3],
        data: Array1<c64>,
        data_err: Array1<c64>,
    },
}

impl OiRowData {
    pub fn kind(&self) -> DataKind {
        match self {
            OiRowData::Vis { .. } => DataKind::Vis,
            OiRowData::Vis2 { .. } => DataKind::Vis2,
            OiRowData::T3 { .. } => DataKind::T3,
        }
    }

    fn lengths(&self) -> (usize, usize) {
        match self {
            OiRowData::Vis { data, data_err, .. } | OiRowData::T3 { data, data_err, .. } => {
                (data.len(), data_err.len())
            }
            OiRowData::Vis2 { data, data_err, .. } => (data.len(), data_err.len()),
        }
    }

    /// Negative errors are how OIFITS writers mark bad data.
    fn error_is_negative(&self, i_chan: usize) -> bool {
        match self {
            OiRowData::Vis { data_err, .. } | OiRowData::T3 { data_err, .. } => {
                let e = data_err[i_chan];
                e.re < 0.0 || e.im < 0.0
            }
            OiRowData::Vis2 { data_err, .. } => data_err[i_chan] < 0.0,
        }
    }
}

/// Per-channel values pulled out of a row. Squared visibilities are real,
/// everything else is complex.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    Real(Array1<f64>),
    Complex(Array1<c64>),
}

impl RowValues {
    pub fn len(&self) -> usize {
        match self {
            RowValues::Real(a) => a.len(),
            RowValues::Complex(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_real(&self) -> Option<&Array1<f64>> {
        match self {
            RowValues::Real(a) => Some(a),
            RowValues::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Array1<c64>> {
        match self {
            RowValues::Real(_) => None,
            RowValues::Complex(a) => Some(a),
        }
    }
}

/// A single observation row. `flags` is index-aligned with the row's data,
/// errors and the wavelength table; `true` means the channel is excluded.
///
/// Flags can only ever go from unmasked to masked.
#[derive(Debug, Clone)]
pub struct OiRow {
    meta: RowMeta,
    flags: Array1<bool>,
    data: OiRowData,
}

impl OiRow {
    /// Create a complex-visibility row.
    pub fn new_vis(
        meta: RowMeta,
        sta_index: [i32; 2],
        flags: Vec<bool>,
        uv: UvPoint,
        data: Vec<c64>,
        data_err: Vec<c64>,
    ) -> Result<OiRow, RowError> {
        OiRow::build(
            meta,
            flags,
            OiRowData::Vis {
                sta_index,
                uv,
                data: Array1::from(data),
                data_err: Array1::from(data_err),
            },
        )
    }

    /// Create a squared-visibility row.
    pub fn new_vis2(
        meta: RowMeta,
        sta_index: [i32; 2],
        flags: Vec<bool>,
        uv: UvPoint,
        data: Vec<f64>,
        data_err: Vec<f64>,
    ) -> Result<OiRow, RowError> {
        OiRow::build(
            meta,
            flags,
            OiRowData::Vis2 {
                sta_index,
                uv,
                data: Array1::from(data),
                data_err: Array1::from(data_err),
            },
        )
    }

    /// Create a closure-phase row. Only two sides of the triangle are needed;
    /// the third (uv31) closes it.
    #[allow(clippy::too_many_arguments)]
    pub fn new_t3(
        meta: RowMeta,
        sta_index: [i32; 3],
        flags: Vec<bool>,
        uv12: UvPoint,
        uv23: UvPoint,
        data: Vec<c64>,
        data_err: Vec<c64>,
    ) -> Result<OiRow, RowError> {
        let uv31 = -(uv12 + uv23);
        OiRow::build(
            meta,
            flags,
            OiRowData::T3 {
                sta_index,
                uv: [uv12, uv23, uv31],
                data: Array1::from(data),
                data_err: Array1::from(data_err),
            },
        )
    }

    fn build(meta: RowMeta, flags: Vec<bool>, data: OiRowData) -> Result<OiRow, RowError> {
        let expected = meta.wavelength.num_channels();
        let (data_len, err_len) = data.lengths();
        for (what, got) in [("flag", flags.len()), ("data", data_len), ("error", err_len)] {
            if got != expected {
                return Err(RowError::LengthMismatch {
                    what,
                    got,
                    expected,
                });
            }
        }

        let mut flags = Array1::from(flags);
        for (i_chan, flag) in flags.iter_mut().enumerate() {
            if data.error_is_negative(i_chan) {
                *flag = true;
            }
        }

        Ok(OiRow { meta, flags, data })
    }

    pub fn kind(&self) -> DataKind {
        self.data.kind()
    }

    pub fn meta(&self) -> &RowMeta {
        &self.meta
    }

    pub fn data(&self) -> &OiRowData {
        &self.data
    }

    /// Access the row's metadata alongside its mutable data.
    pub(crate) fn parts_mut(&mut self) -> (&RowMeta, &mut OiRowData) {
        (&self.meta, &mut self.data)
    }

    pub fn flags(&self) -> ArrayView1<bool> {
        self.flags.view()
    }

    pub fn station_indices(&self) -> &[i32] {
        match &self.data {
            OiRowData::Vis { sta_index, .. } | OiRowData::Vis2 { sta_index, .. } => &sta_index[..],
            OiRowData::T3 { sta_index, .. } => &sta_index[..],
        }
    }

    pub fn uv_points(&self) -> &[UvPoint] {
        match &self.data {
            OiRowData::Vis { uv, .. } | OiRowData::Vis2 { uv, .. } => std::slice::from_ref(uv),
            OiRowData::T3 { uv, .. } => &uv[..],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.flags.len()
    }

    /// The indices of all channels that aren't masked.
    pub fn unmasked_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, &flag)| !flag)
            .map(|(i, _)| i)
    }

    /// The number of unmasked channels, i.e. how much data this row
    /// contributes.
    pub fn masked_ndata(&self) -> usize {
        self.flags.iter().filter(|&&flag| !flag).count()
    }

    pub fn raw_wavelengths(&self) -> &[f64] {
        self.meta.wavelength.eff_wave.as_slice()
    }

    pub fn masked_wavelengths(&self) -> Array1<f64> {
        select_unflagged(self.raw_wavelengths().iter(), &self.flags)
    }

    pub fn raw_data(&self) -> RowValues {
        match &self.data {
            OiRowData::Vis { data, .. } | OiRowData::T3 { data, .. } => {
                RowValues::Complex(data.clone())
            }
            OiRowData::Vis2 { data, .. } => RowValues::Real(data.clone()),
        }
    }

    pub fn raw_data_error(&self) -> RowValues {
        match &self.data {
            OiRowData::Vis { data_err, .. } | OiRowData::T3 { data_err, .. } => {
                RowValues::Complex(data_err.clone())
            }
            OiRowData::Vis2 { data_err, .. } => RowValues::Real(data_err.clone()),
        }
    }

    /// The data of all unmasked channels, in channel order.
    pub fn masked_data(&self) -> RowValues {
        match &self.data {
            OiRowData::Vis { data, .. } | OiRowData::T3 { data, .. } => {
                RowValues::Complex(select_unflagged(data.iter(), &self.flags))
            }
            OiRowData::Vis2 { data, .. } => {
                RowValues::Real(select_unflagged(data.iter(), &self.flags))
            }
        }
    }

    /// The errors of all unmasked channels, in channel order.
    pub fn masked_data_error(&self) -> RowValues {
        match &self.data {
            OiRowData::Vis { data_err, .. } | OiRowData::T3 { data_err, .. } => {
                RowValues::Complex(select_unflagged(data_err.iter(), &self.flags))
            }
            OiRowData::Vis2 { data_err, .. } => {
                RowValues::Real(select_unflagged(data_err.iter(), &self.flags))
            }
        }
    }

    /// Mask `k` distinct, currently-unmasked channels chosen uniformly at
    /// random. Fails without touching the mask if fewer than `k` channels are
    /// unmasked.
    pub fn random_mask<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> Result<(), RowError> {
        let unmasked: Vec<usize> = self.unmasked_channels().collect();
        if k > unmasked.len() {
            return Err(RowError::RandomMaskTooLarge {
                requested: k,
                available: unmasked.len(),
            });
        }

        for i in rand::seq::index::sample(rng, unmasked.len(), k).into_iter() {
            self.flags[unmasked[i]] = true;
        }
        trace!(
            "Randomly masked {k} of {} unmasked {} channels",
            unmasked.len(),
            self.kind()
        );
        Ok(())
    }

    /// Mask every channel for which `mask` returns `true`. Already-masked
    /// channels stay masked.
    pub(crate) fn mask_where<F: Fn(usize) -> bool>(&mut self, mask: F) {
        for (i_chan, flag) in self.flags.iter_mut().enumerate() {
            if mask(i_chan) {
                *flag = true;
            }
        }
    }
}

fn select_unflagged<'a, T: Clone + 'a>(
    values: impl Iterator<Item = &'a T>,
    flags: &Array1<bool>,
) -> Array1<T> {
    values
        .zip(flags.iter())
        .filter(|(_, &flag)| !flag)
        .map(|(v, _)| v.clone())
        .collect()
}
