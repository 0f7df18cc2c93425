//! Synthetic datasets, for exercising the resampling and recalibration code
//! without an OIFITS file.

use std::{f64::consts::TAU, sync::Arc};

use hifitime::{Duration, Epoch};
use log::debug;
use rand::Rng;
use vec1::{vec1, Vec1};

use crate::{
    c64, calibrate::Calibrator, OiArray, OiRow, OiStation, OiTarget, OiWavelength, RowError,
    RowMeta, UvPoint,
};

/// The shape of a simulated dataset.
#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub num_vis: usize,
    pub num_vis2: usize,
    pub num_t3: usize,

    /// The number of spectral channels.
    pub num_channels: usize,

    /// The shortest and longest wavelengths \[metres\].
    pub wavelength_range: (f64, f64),

    /// The longest projected baseline \[metres\].
    pub max_baseline: f64,

    /// The probability that any single channel is flagged.
    pub flag_fraction: f64,

    /// Fractional error of every measurement.
    pub noise: f64,

    pub num_stations: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            num_vis: 10,
            num_vis2: 40,
            num_t3: 20,
            num_channels: 16,
            wavelength_range: (1.5e-6, 2.4e-6),
            max_baseline: 330.0,
            flag_fraction: 0.1,
            noise: 0.05,
            num_stations: 6,
        }
    }
}

/// Make a dataset whose values follow `calibrator`'s predictions (with some
/// noise), i.e. data that look like they were calibrated against it.
///
/// Rows are produced in the order vis, vis2, t3.
pub fn simulate_dataset<R: Rng + ?Sized>(
    params: &SimulationParams,
    calibrator: &dyn Calibrator,
    rng: &mut R,
) -> Result<Vec<OiRow>, RowError> {
    let wavelength = Arc::new(simulated_wavelengths(
        params.num_channels,
        params.wavelength_range,
    ));
    let array = Arc::new(simulated_array(params.num_stations.max(3)));
    let target = Arc::new(OiTarget {
        target_id: 1,
        name: "SIM".to_string(),
        equinox: 2000.0,
        ..Default::default()
    });
    let num_stations = array.stations.len();
    let int_time = Duration::from_seconds(10.0);
    let start = Epoch::from_mjd_utc(60000.0);

    let num_rows = params.num_vis + params.num_vis2 + params.num_t3;
    let mut rows = Vec::with_capacity(num_rows);
    for i_row in 0..num_rows {
        let time = i_row as f64 * int_time.to_seconds();
        let meta = RowMeta {
            target: Arc::clone(&target),
            array: Arc::clone(&array),
            wavelength: Arc::clone(&wavelength),
            time,
            mjd: start + Duration::from_seconds(time),
            int_time,
        };
        let flags: Vec<bool> = (0..wavelength.num_channels())
            .map(|_| rng.random::<f64>() < params.flag_fraction)
            .collect();
        let stations = pick_stations(num_stations, rng);

        let row = if i_row < params.num_vis {
            let uv = random_uv(params.max_baseline, rng);
            let (data, data_err): (Vec<c64>, Vec<c64>) = wavelength
                .eff_wave
                .iter()
                .map(|&lambda| {
                    let amp = calibrator.vis2(uv, lambda).sqrt() * jitter(params.noise, rng);
                    let err = (amp * params.noise).abs();
                    (c64::new(amp, 0.0), c64::new(err, err))
                })
                .unzip();
            OiRow::new_vis(
                meta,
                [stations[0], stations[1]],
                flags,
                uv,
                data,
                data_err,
            )?
        } else if i_row < params.num_vis + params.num_vis2 {
            let uv = random_uv(params.max_baseline, rng);
            let (data, data_err): (Vec<f64>, Vec<f64>) = wavelength
                .eff_wave
                .iter()
                .map(|&lambda| {
                    let v2 = calibrator.vis2(uv, lambda) * jitter(params.noise, rng);
                    (v2, (v2 * params.noise).abs())
                })
                .unzip();
            OiRow::new_vis2(
                meta,
                [stations[0], stations[1]],
                flags,
                uv,
                data,
                data_err,
            )?
        } else {
            let uv12 = random_uv(params.max_baseline / 2.0, rng);
            let uv23 = random_uv(params.max_baseline / 2.0, rng);
            let uv31 = -(uv12 + uv23);
            let (data, data_err): (Vec<c64>, Vec<c64>) = wavelength
                .eff_wave
                .iter()
                .map(|&lambda| {
                    let t3 = calibrator.t3(uv12, uv23, uv31, lambda) * jitter(params.noise, rng);
                    (t3, c64::new((t3.norm() * params.noise).abs(), params.noise))
                })
                .unzip();
            OiRow::new_t3(meta, stations, flags, uv12, uv23, data, data_err)?
        };
        rows.push(row);
    }

    debug!(
        "Simulated {} vis, {} vis2 and {} t3 rows with {} channels each",
        params.num_vis, params.num_vis2, params.num_t3, params.num_channels
    );
    Ok(rows)
}

fn simulated_wavelengths(num_channels: usize, (min, max): (f64, f64)) -> OiWavelength {
    let num_channels = num_channels.max(1);
    let step = if num_channels > 1 {
        (max - min) / (num_channels - 1) as f64
    } else {
        0.0
    };
    let mut eff_wave: Vec1<f64> = vec1![min];
    eff_wave.extend((1..num_channels).map(|i| min + i as f64 * step));
    let eff_band = eff_wave.mapped_ref(|_| step.max(1e-9));
    OiWavelength {
        insname: "SIM".to_string(),
        eff_wave,
        eff_band,
    }
}

fn simulated_array(num_stations: usize) -> OiArray {
    let stations = (0..num_stations)
        .map(|i| {
            let angle = TAU * i as f64 / num_stations as f64;
            OiStation {
                tel_name: format!("T{}", i + 1),
                sta_name: format!("S{}", i + 1),
                sta_index: i as i32 + 1,
                diameter: 1.0,
                staxyz: [100.0 * angle.cos(), 100.0 * angle.sin(), 0.0],
            }
        })
        .collect();
    OiArray {
        arrname: "SIM".to_string(),
        frame: "GEOCENTRIC".to_string(),
        array_xyz: [0.0; 3],
        stations,
    }
}

/// Three distinct station indices.
fn pick_stations<R: Rng + ?Sized>(num_stations: usize, rng: &mut R) -> [i32; 3] {
    let picked = rand::seq::index::sample(rng, num_stations, 3);
    [
        picked.index(0) as i32 + 1,
        picked.index(1) as i32 + 1,
        picked.index(2) as i32 + 1,
    ]
}

fn random_uv<R: Rng + ?Sized>(max_baseline: f64, rng: &mut R) -> UvPoint {
    let length = max_baseline * rng.random::<f64>();
    let angle = TAU * rng.random::<f64>();
    UvPoint::new(length * angle.cos(), length * angle.sin())
}

/// A multiplicative factor in `[1 - noise, 1 + noise)`.
fn jitter<R: Rng + ?Sized>(noise: f64, rng: &mut R) -> f64 {
    1.0 + noise * (2.0 * rng.random::<f64>() - 1.0)
}
