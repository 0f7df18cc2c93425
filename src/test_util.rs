//! Helpers for building small rows in tests.

use std::sync::Arc;

use hifitime::{Duration, Epoch};
use vec1::Vec1;

use crate::{c64, OiArray, OiRow, OiTarget, OiWavelength, RowMeta, UvPoint};

/// Metadata with `n` channels, evenly spaced from 1.5 to 2.5 microns.
pub(crate) fn meta(n: usize) -> RowMeta {
    let eff_wave: Vec<f64> = (0..n)
        .map(|i| 1.5e-6 + i as f64 * 1e-6 / n.max(2).saturating_sub(1) as f64)
        .collect();
    let eff_wave = Vec1::try_from_vec(eff_wave).unwrap();
    let eff_band = eff_wave.mapped_ref(|_| 1e-8);
    RowMeta {
        target: Arc::new(OiTarget {
            target_id: 1,
            name: "test".to_string(),
            ..Default::default()
        }),
        array: Arc::new(OiArray::default()),
        wavelength: Arc::new(OiWavelength {
            insname: "test".to_string(),
            eff_wave,
            eff_band,
        }),
        time: 0.0,
        mjd: Epoch::from_mjd_utc(59000.0),
        int_time: Duration::from_seconds(10.0),
    }
}

pub(crate) fn vis2_row(data: &[f64], err: &[f64], flags: &[bool]) -> OiRow {
    OiRow::new_vis2(
        meta(data.len()),
        [1, 2],
        flags.to_vec(),
        UvPoint::new(30.0, 40.0),
        data.to_vec(),
        err.to_vec(),
    )
    .unwrap()
}

/// A squared-visibility row with `n_active` unmasked channels out of
/// `n_chan`; the masked channels come last.
pub(crate) fn vis2_row_with_active(n_chan: usize, n_active: usize) -> OiRow {
    let data: Vec<f64> = (0..n_chan).map(|i| i as f64).collect();
    let err = vec![0.1; n_chan];
    let flags: Vec<bool> = (0..n_chan).map(|i| i >= n_active).collect();
    vis2_row(&data, &err, &flags)
}

pub(crate) fn t3_row(data: &[c64], err: &[c64], flags: &[bool]) -> OiRow {
    OiRow::new_t3(
        meta(data.len()),
        [1, 2, 3],
        flags.to_vec(),
        UvPoint::new(10.0, 0.0),
        UvPoint::new(0.0, 20.0),
        data.to_vec(),
        err.to_vec(),
    )
    .unwrap()
}

pub(crate) fn vis_row(data: &[c64], err: &[c64], flags: &[bool]) -> OiRow {
    OiRow::new_vis(
        meta(data.len()),
        [2, 3],
        flags.to_vec(),
        UvPoint::new(-5.0, 12.0),
        data.to_vec(),
        err.to_vec(),
    )
    .unwrap()
}

/// `n` rows of each kind with varying active-channel counts.
pub(crate) fn mixed_rows(n: usize, n_chan: usize) -> Vec<OiRow> {
    let mut rows = vec![];
    for i in 0..n {
        let flags: Vec<bool> = (0..n_chan).map(|c| (c + i) % 3 == 0).collect();
        let cdata: Vec<c64> = (0..n_chan).map(|c| c64::new(c as f64, i as f64)).collect();
        let cerr = vec![c64::new(0.1, 0.01); n_chan];
        rows.push(vis_row(&cdata, &cerr, &flags));
        rows.push(vis2_row_with_active(n_chan, (i % n_chan) + 1));
        rows.push(t3_row(&cdata, &cerr, &flags));
    }
    rows
}
