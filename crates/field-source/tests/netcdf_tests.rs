//! Tests for the native NetCDF reader.
//!
//! Fixtures are written with the netcdf crate into a temporary directory.
//! The GEOS-CF sample test needs real data and is skipped when absent.

#![cfg(feature = "netcdf")]

use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use field_source::{
    open_source, select_and_reduce, FieldSource, NetCdfFieldSource, SelectionRequest,
};
use plume_common::{AnalysisWindow, PlumeError, Reducer};
use test_utils::{assert_approx_eq, require_test_file};

const NLAT: usize = 3;
const NLON: usize = 4;
const FILL: f32 = -9999.0;

fn hour(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// Six samples four hours apart, a degenerate level axis, and every cell of
/// sample `k` set to `k`. Cell (0, 0) of sample 3 is the fill value.
fn write_fixture(path: &Path, time_offsets: &[f64]) {
    let ntime = time_offsets.len();
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", ntime).unwrap();
    file.add_dimension("lev", 1).unwrap();
    file.add_dimension("lat", NLAT).unwrap();
    file.add_dimension("lon", NLON).unwrap();

    {
        let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
        var.put_attribute("units", "hours since 2020-01-01 00:00:00")
            .unwrap();
        var.put_values(time_offsets, ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("lat", &["lat"]).unwrap();
        var.put_values(&[-1.0_f64, 0.0, 1.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("lon", &["lon"]).unwrap();
        var.put_values(&[10.0_f64, 11.0, 12.0, 13.0], ..).unwrap();
    }
    {
        let mut values: Vec<f32> = (0..ntime)
            .flat_map(|k| std::iter::repeat(k as f32).take(NLAT * NLON))
            .collect();
        if ntime > 3 {
            values[3 * NLAT * NLON] = FILL;
        }
        let mut var = file
            .add_variable::<f32>("pm25", &["time", "lev", "lat", "lon"])
            .unwrap();
        var.put_attribute("_FillValue", FILL).unwrap();
        var.put_values(&values, ..).unwrap();
    }
}

fn six_samples() -> Vec<f64> {
    (0..6).map(|k| k as f64 * 4.0).collect()
}

#[test]
fn test_load_restricts_to_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cf.nc4");
    write_fixture(&path, &six_samples());

    let source = NetCdfFieldSource::new(path.to_string_lossy());
    let window = AnalysisWindow::new(hour(6), hour(14));
    let dataset = source.load(&["pm25".to_string()], &window).unwrap();

    assert_eq!(dataset.times, vec![hour(8), hour(12)]);
    let var = dataset.variable("pm25").unwrap();
    assert_eq!(var.shape, vec![2, 1, NLAT, NLON]);
    assert!(var.values[..NLAT * NLON].iter().all(|v| *v == 2.0));
    assert!(var.values[NLAT * NLON].is_nan());
    assert!(var.values[NLAT * NLON + 1..].iter().all(|v| *v == 3.0));
}

#[test]
fn test_window_outside_file_reads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cf.nc4");
    write_fixture(&path, &six_samples());

    let source = NetCdfFieldSource::new(path.to_string_lossy());
    let start = hour(0) + Duration::days(3);
    let window = AnalysisWindow::new(start, start + Duration::days(1));
    let dataset = source.load(&["pm25".to_string()], &window).unwrap();
    assert!(dataset.times.is_empty());
    assert!(dataset.variable("pm25").unwrap().values.is_empty());

    let request = SelectionRequest {
        window,
        variables: vec!["pm25".to_string()],
        scale: 1.0,
        reducer: Reducer::Mean,
    };
    assert!(matches!(
        select_and_reduce(&dataset, &request),
        Err(PlumeError::DataUnavailable(_))
    ));
}

#[test]
fn test_reduce_over_window_from_netcdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cf.nc4");
    write_fixture(&path, &six_samples());

    let window = AnalysisWindow::new(hour(0), hour(8));
    let source = open_source(&path.to_string_lossy()).unwrap();
    let dataset = source.load(&["pm25".to_string()], &window).unwrap();
    let request = SelectionRequest {
        window,
        variables: vec!["pm25".to_string()],
        scale: 1.0,
        reducer: Reducer::Max,
    };
    let field = select_and_reduce(&dataset, &request).unwrap();
    assert_eq!(field.width(), NLON);
    assert_eq!(field.height(), NLAT);
    assert!(field.values().iter().all(|v| *v == 2.0));
    assert_eq!(field.time(), hour(4));
}

#[test]
fn test_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cf.nc4");
    write_fixture(&path, &six_samples());

    let source = NetCdfFieldSource::new(path.to_string_lossy());
    let err = source
        .load(&["no2".to_string()], &AnalysisWindow::new(hour(0), hour(24)))
        .unwrap_err();
    assert!(matches!(err, PlumeError::VariableNotFound { ref variable, .. } if variable == "no2"));
}

#[test]
fn test_corrupt_time_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cf.nc4");
    write_fixture(&path, &[0.0, 1e30]);

    let source = NetCdfFieldSource::new(path.to_string_lossy());
    let err = source
        .load(&["pm25".to_string()], &AnalysisWindow::new(hour(0), hour(24)))
        .unwrap_err();
    assert!(matches!(err, PlumeError::InvalidFormat { .. }));
}

#[test]
fn test_geos_cf_sample() {
    let path = require_test_file!("geos_cf_sample.nc4");
    let source = NetCdfFieldSource::new(path.to_string_lossy());

    // Wide enough to keep every sample in a one-day file.
    let window = AnalysisWindow::new(
        NaiveDate::from_ymd_opt(1900, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        NaiveDate::from_ymd_opt(2100, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
    );
    let dataset = source.load(&["pm25_rh35_gcc".to_string()], &window).unwrap();
    assert_eq!(dataset.lon.len(), 1440);
    assert_eq!(dataset.lat.len(), 721);
    assert_approx_eq!(dataset.lat[0], -90.0, 1e-6);

    let request = SelectionRequest {
        window,
        variables: vec!["pm25_rh35_gcc".to_string()],
        scale: 1.0,
        reducer: Reducer::Mean,
    };
    let field = select_and_reduce(&dataset, &request).unwrap();
    assert!(field.values().iter().any(|v| v.is_finite() && *v > 0.0));
}
