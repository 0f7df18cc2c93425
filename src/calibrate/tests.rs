use std::f64::consts::{LN_2, PI};

use approx::assert_abs_diff_eq;
use ndarray::array;

use super::*;
use crate::{test_util::*, RowValues};

/// A calibrator that predicts the same thing everywhere.
struct Constant {
    vis2: f64,
    t3: c64,
}

impl Calibrator for Constant {
    fn vis2(&self, _uv: UvPoint, _wavelength: f64) -> f64 {
        self.vis2
    }

    fn t3(&self, _uv12: UvPoint, _uv23: UvPoint, _uv31: UvPoint, _wavelength: f64) -> c64 {
        self.t3
    }
}

fn constant(vis2: f64, t3: c64) -> Constant {
    Constant { vis2, t3 }
}

#[test]
fn vis2_ratio_example() {
    let rows = vec![vis2_row(&[1.0, 2.0, 3.0], &[0.1, 0.1, 0.1], &[false; 3])];
    let old = constant(1.0, c64::new(1.0, 0.0));
    let new = constant(2.0, c64::new(1.0, 0.0));
    let out = recalibrate(&rows, &old, &new, RecalibrationOptions::default());
    assert_eq!(out.len(), 1);
    let data = out[0].raw_data();
    let data = data.as_real().unwrap();
    assert_abs_diff_eq!(data[0], 0.5);
    assert_abs_diff_eq!(data[1], 1.0);
    assert_abs_diff_eq!(data[2], 1.5);
    // Errors aren't touched by default.
    assert_eq!(
        out[0].raw_data_error(),
        RowValues::Real(array![0.1, 0.1, 0.1])
    );
}

#[test]
fn input_is_untouched() {
    let rows = vec![vis2_row(&[1.0, 2.0, 3.0], &[0.1, 0.1, 0.1], &[false; 3])];
    let old = constant(1.0, c64::new(1.0, 0.0));
    let new = constant(4.0, c64::new(2.0, 0.0));
    let out = recalibrate(&rows, &old, &new, RecalibrationOptions::default());
    assert_eq!(rows[0].raw_data(), RowValues::Real(array![1.0, 2.0, 3.0]));
    assert_ne!(out[0].raw_data(), rows[0].raw_data());
}

#[test]
fn identical_calibrators_change_nothing() {
    let rows = mixed_rows(4, 6);
    let cal = GaussianDisk::from_mas(2.0);
    let options = RecalibrationOptions {
        error_scaling: ErrorScaling::Scaled,
    };
    let out = recalibrate(&rows, &cal, &cal, options);
    assert_eq!(out.len(), rows.len());
    for (before, after) in rows.iter().zip(out.iter()) {
        assert_eq!(before.kind(), after.kind());
        match (before.raw_data(), after.raw_data()) {
            (RowValues::Real(b), RowValues::Real(a)) => {
                for (b, a) in b.iter().zip(a.iter()) {
                    assert_abs_diff_eq!(b, a, epsilon = 1e-12);
                }
            }
            (RowValues::Complex(b), RowValues::Complex(a)) => {
                for (b, a) in b.iter().zip(a.iter()) {
                    assert_abs_diff_eq!(b, a, epsilon = 1e-12);
                }
            }
            _ => panic!("kind changed"),
        }
        assert_eq!(before.raw_data_error(), after.raw_data_error());
    }
}

#[test]
fn t3_uses_complex_ratio() {
    let data = [c64::new(1.0, 0.0), c64::new(0.0, 2.0)];
    let err = [c64::new(0.1, 0.05); 2];
    let rows = vec![t3_row(&data, &err, &[false, false])];
    let old = constant(1.0, c64::new(0.0, 1.0));
    let new = constant(1.0, c64::new(2.0, 0.0));
    let out = recalibrate(&rows, &old, &new, RecalibrationOptions::default());
    // ratio = i / 2
    let out_data = out[0].raw_data();
    let out_data = out_data.as_complex().unwrap();
    assert_abs_diff_eq!(out_data[0], c64::new(0.0, 0.5));
    assert_abs_diff_eq!(out_data[1], c64::new(-1.0, 0.0));
    assert_eq!(
        out[0].raw_data_error().as_complex().unwrap()[0],
        c64::new(0.1, 0.05)
    );
}

#[test]
fn masked_channels_are_rescaled_too() {
    let rows = vec![vis2_row(&[1.0, 2.0], &[0.1, 0.1], &[true, false])];
    let old = constant(3.0, c64::new(1.0, 0.0));
    let new = constant(1.0, c64::new(1.0, 0.0));
    let out = recalibrate(&rows, &old, &new, RecalibrationOptions::default());
    assert_eq!(out[0].raw_data(), RowValues::Real(array![3.0, 6.0]));
    assert_eq!(out[0].masked_data(), RowValues::Real(array![6.0]));
    assert_eq!(out[0].flags(), rows[0].flags());
}

#[test]
fn scaled_errors() {
    let options = RecalibrationOptions {
        error_scaling: ErrorScaling::Scaled,
    };
    let old = constant(1.0, c64::new(0.0, 3.0));
    let new = constant(2.0, c64::new(1.0, 0.0));

    let mut row = vis2_row(&[1.0, 2.0], &[0.2, 0.4], &[false, false]);
    recalibrate_vis2(&mut row, &old, &new, options);
    let err = row.raw_data_error();
    let err = err.as_real().unwrap();
    assert_abs_diff_eq!(err[0], 0.1);
    assert_abs_diff_eq!(err[1], 0.2);

    // Closure-phase amplitude errors scale with |ratio| = 3; phase errors
    // don't.
    let mut row = t3_row(&[c64::new(1.0, 0.0)], &[c64::new(0.1, 0.05)], &[false]);
    recalibrate_t3(&mut row, &old, &new, options);
    let err = row.raw_data_error();
    let err = err.as_complex().unwrap();
    assert_abs_diff_eq!(err[0].re, 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(err[0].im, 0.05);
}

#[test]
fn wrong_kind_is_a_no_op() {
    let old = constant(1.0, c64::new(1.0, 0.0));
    let new = constant(2.0, c64::new(2.0, 0.0));
    let options = RecalibrationOptions::default();

    let mut row = t3_row(&[c64::new(1.0, 1.0)], &[c64::new(0.1, 0.1)], &[false]);
    let before = row.raw_data();
    recalibrate_vis2(&mut row, &old, &new, options);
    assert_eq!(row.raw_data(), before);

    let mut row = vis2_row(&[1.0], &[0.1], &[false]);
    recalibrate_t3(&mut row, &old, &new, options);
    assert_eq!(row.raw_data(), RowValues::Real(array![1.0]));

    // Plain visibilities are never recalibrated.
    let rows = vec![vis_row(&[c64::new(0.5, 0.5)], &[c64::new(0.1, 0.1)], &[false])];
    let out = recalibrate(&rows, &old, &new, options);
    assert_eq!(out[0].raw_data(), rows[0].raw_data());
}

#[test]
fn zero_new_calibrator_gives_non_finite_data() {
    let rows = vec![vis2_row(&[1.0], &[0.1], &[false])];
    let old = constant(1.0, c64::new(1.0, 0.0));
    let new = constant(0.0, c64::new(1.0, 0.0));
    let out = recalibrate(&rows, &old, &new, RecalibrationOptions::default());
    assert!(out[0].raw_data().as_real().unwrap()[0].is_infinite());
}

#[test]
fn point_source_is_unity() {
    let uv = UvPoint::new(100.0, -20.0);
    assert_abs_diff_eq!(PointSource.vis2(uv, 2e-6), 1.0);
    assert_abs_diff_eq!(PointSource.t3(uv, uv, -(uv + uv), 2e-6), c64::new(1.0, 0.0));
}

#[test]
fn gaussian_disk_visibility() {
    let disk = GaussianDisk::from_mas(1.0);
    let wavelength = 2e-6;
    // Zero baseline -> unresolved.
    assert_abs_diff_eq!(disk.vis2(UvPoint::default(), wavelength), 1.0);

    // At pi * fwhm * B / lambda = 2 sqrt(ln 2), V = 1/e.
    let b = 2.0 * LN_2.sqrt() * wavelength / (PI * disk.fwhm);
    let uv = UvPoint::new(0.6 * b, 0.8 * b);
    assert_abs_diff_eq!(disk.visibility(uv, wavelength), (-1.0_f64).exp(), epsilon = 1e-12);
    assert_abs_diff_eq!(disk.vis2(uv, wavelength), (-2.0_f64).exp(), epsilon = 1e-12);

    // Longer wavelengths are less resolved.
    assert!(disk.vis2(uv, 2.0 * wavelength) > disk.vis2(uv, wavelength));

    // A closed triangle gives a real, positive triple product.
    let uv12 = UvPoint::new(30.0, 10.0);
    let uv23 = UvPoint::new(-10.0, 50.0);
    let uv31 = -(uv12 + uv23);
    let t3 = disk.t3(uv12, uv23, uv31, wavelength);
    assert_abs_diff_eq!(t3.im, 0.0);
    assert!(t3.re > 0.0 && t3.re <= 1.0);
    assert_abs_diff_eq!(
        t3.re,
        disk.visibility(uv12, wavelength)
            * disk.visibility(uv23, wavelength)
            * disk.visibility(uv31, wavelength),
        epsilon = 1e-15
    );
}

#[test]
fn parse_error_scaling() {
    assert_eq!(
        "scaled".parse::<ErrorScaling>().unwrap(),
        ErrorScaling::Scaled
    );
    assert_eq!(
        "Unscaled".parse::<ErrorScaling>().unwrap(),
        ErrorScaling::Unscaled
    );
    assert!("both".parse::<ErrorScaling>().is_err());
}
