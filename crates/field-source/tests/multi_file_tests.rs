//! Tests for opening JSON grid sources from disk, including wildcard
//! concatenation along time.

use chrono::{NaiveDate, NaiveDateTime};
use field_source::{open_source, select_and_reduce, GridDocument, SelectionRequest};
use plume_common::{AnalysisWindow, PlumeError, Reducer};
use test_utils::assert_approx_eq;

fn hour(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn write_hourly_file(dir: &std::path::Path, h: u32, value: f32) {
    GridDocument::new(vec![0.0, 1.0, 2.0], vec![-1.0, 1.0])
        .with_times(&[hour(h)])
        .with_variable("pm25", &["time", "lat", "lon"], &[value; 6])
        .with_variable("dust", &["time", "lat", "lon"], &[1.0; 6])
        .write_to(dir.join(format!("cf_{:02}.json", h)))
        .unwrap();
}

fn day() -> AnalysisWindow {
    AnalysisWindow::new(hour(0), hour(24))
}

fn request(vars: &[&str], reducer: Reducer) -> SelectionRequest {
    SelectionRequest {
        window: day(),
        variables: vars.iter().map(|v| v.to_string()).collect(),
        scale: 1.0,
        reducer,
    }
}

#[test]
fn test_wildcard_source_concatenates_time() {
    let dir = tempfile::tempdir().unwrap();
    for (h, v) in [(3, 30.0), (0, 10.0), (6, 20.0)] {
        write_hourly_file(dir.path(), h, v);
    }

    let pattern = dir.path().join("cf_*.json");
    let source = open_source(pattern.to_str().unwrap()).unwrap();
    let dataset = source.load(&["pm25".to_string()], &day()).unwrap();
    assert_eq!(dataset.times, vec![hour(0), hour(3), hour(6)]);

    let field = select_and_reduce(&dataset, &request(&["pm25"], Reducer::Mean)).unwrap();
    assert_eq!(field.width(), 3);
    assert_eq!(field.height(), 2);
    for v in field.values() {
        assert_approx_eq!(*v, 20.0, 1e-5);
    }
    assert_eq!(field.time(), hour(3));
}

#[test]
fn test_composite_variables_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_hourly_file(dir.path(), 0, 10.0);
    write_hourly_file(dir.path(), 1, 12.0);

    let pattern = dir.path().join("cf_*.json");
    let source = open_source(pattern.to_str().unwrap()).unwrap();
    let vars = vec!["pm25".to_string(), "dust".to_string()];
    let dataset = source.load(&vars, &day()).unwrap();
    let field = select_and_reduce(&dataset, &request(&["pm25", "dust"], Reducer::Max)).unwrap();
    assert_eq!(field.values()[0], 13.0);
}

#[test]
fn test_missing_variable_in_one_file() {
    let dir = tempfile::tempdir().unwrap();
    write_hourly_file(dir.path(), 0, 10.0);
    GridDocument::new(vec![0.0, 1.0, 2.0], vec![-1.0, 1.0])
        .with_times(&[hour(1)])
        .with_variable("dust", &["time", "lat", "lon"], &[1.0; 6])
        .write_to(dir.path().join("cf_01.json"))
        .unwrap();

    let pattern = dir.path().join("cf_*.json");
    let source = open_source(pattern.to_str().unwrap()).unwrap();
    let err = source.load(&["pm25".to_string()], &day()).unwrap_err();
    assert!(matches!(err, PlumeError::VariableNotFound { .. }));
}

#[test]
fn test_corrupt_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"lon\": [").unwrap();
    let source = open_source(path.to_str().unwrap()).unwrap();
    assert!(matches!(
        source.load(&["pm25".to_string()], &day()),
        Err(PlumeError::InvalidFormat { .. })
    ));
}

#[test]
fn test_load_reads_only_window_samples() {
    let dir = tempfile::tempdir().unwrap();
    let times: Vec<_> = (0..6).map(|k| hour(k * 4)).collect();
    let values: Vec<f32> = (0..6).flat_map(|k| [k as f32; 6]).collect();
    let path = dir.path().join("hourly.json");
    GridDocument::new(vec![0.0, 1.0, 2.0], vec![-1.0, 1.0])
        .with_times(&times)
        .with_variable("pm25", &["time", "lat", "lon"], &values)
        .write_to(&path)
        .unwrap();

    let source = open_source(path.to_str().unwrap()).unwrap();
    let window = AnalysisWindow::new(hour(5), hour(12));
    let dataset = source.load(&["pm25".to_string()], &window).unwrap();
    assert_eq!(dataset.times, vec![hour(8), hour(12)]);
    let var = dataset.variable("pm25").unwrap();
    assert_eq!(var.shape, vec![2, 2, 3]);
    assert_eq!(&var.values[..6], &[2.0; 6]);
    assert_eq!(&var.values[6..], &[3.0; 6]);

    // nothing in the window: the load succeeds, the reduction reports it
    let late = AnalysisWindow::new(hour(30), hour(40));
    let dataset = source.load(&["pm25".to_string()], &late).unwrap();
    assert!(dataset.times.is_empty());
    let mut req = request(&["pm25"], Reducer::Mean);
    req.window = late;
    assert!(matches!(
        select_and_reduce(&dataset, &req),
        Err(PlumeError::DataUnavailable(_))
    ));
}
