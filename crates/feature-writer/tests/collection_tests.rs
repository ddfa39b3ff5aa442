//! Write/read tests for feature collections in both formats.

use std::fs;

use feature_writer::{read_collection, write_collection};
use plume_common::{PlumeError, PolygonFeature};
use test_utils::{assert_coords_approx_eq, temp_test_dir};

fn ring(cx: f64, cy: f64, r: f64) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = (0..12)
        .map(|k| {
            let a = k as f64 * std::f64::consts::TAU / 12.0;
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect();
    pts.push(pts[0]);
    pts
}

fn feature(level: f64, cx: f64) -> PolygonFeature {
    PolygonFeature {
        exterior: ring(cx, 45.0, 2.0),
        attribute: "pm25".to_string(),
        level,
    }
}

#[test]
fn test_round_trip_preserves_order_levels_and_vertices() {
    let dir = temp_test_dir();
    let path = dir.path().join("pm25_20200615.geojson");
    let features = vec![feature(10.0, -5.0), feature(10.0, 5.0), feature(25.0, 0.0)];

    let summary = write_collection(&path, "pm25", &features).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.count_for(10.0), 2);

    let stored = read_collection(&path).unwrap();
    assert_eq!(stored.attribute, "pm25");
    assert_eq!(stored.features.len(), features.len());
    for (got, want) in stored.features.iter().zip(&features) {
        assert_eq!(got.level, want.level);
        assert_eq!(got.attribute, want.attribute);
        assert_eq!(got.exterior.len(), want.exterior.len());
        for (&a, &b) in got.exterior.iter().zip(&want.exterior) {
            assert_coords_approx_eq!((a.0, a.1), (b.0, b.1), 1e-12);
        }
    }
    assert_eq!(stored.at_level(25.0).count(), 1);
    assert_eq!(stored.at_level(10.0 + 1e-12).count(), 2);
}

#[test]
fn test_zero_features_is_valid() {
    let dir = temp_test_dir();
    let path = dir.path().join("empty.geojson");
    let summary = write_collection(&path, "pm25", &[]).unwrap();
    assert_eq!(summary.total, 0);

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["schema"]["properties"]["pm25"], "float");
    assert_eq!(json["features"].as_array().unwrap().len(), 0);

    let stored = read_collection(&path).unwrap();
    assert!(stored.features.is_empty());
}

#[test]
fn test_rewrite_is_identical_and_leaves_no_temp_files() {
    let dir = temp_test_dir();
    let path = dir.path().join("out.geojson");
    let features = vec![feature(25.0, 0.0)];

    write_collection(&path, "pm25", &features).unwrap();
    let first = fs::read(&path).unwrap();
    write_collection(&path, "pm25", &features).unwrap();
    let second = fs::read(&path).unwrap();
    assert_eq!(first, second);

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "only the collection should remain");
}

#[test]
fn test_overwrite_replaces_previous_contents() {
    let dir = temp_test_dir();
    let path = dir.path().join("out.geojson");
    write_collection(&path, "pm25", &[feature(10.0, 0.0), feature(25.0, 0.0)]).unwrap();
    write_collection(&path, "pm25", &[]).unwrap();
    assert!(read_collection(&path).unwrap().features.is_empty());
}

#[test]
fn test_schema_violations_rejected() {
    let dir = temp_test_dir();
    let cases = [
        (
            "wrong_geometry.geojson",
            r#"{"type":"FeatureCollection","schema":{"geometry":"LineString","properties":{"pm25":"float"}},"features":[]}"#,
        ),
        (
            "two_attrs.geojson",
            r#"{"type":"FeatureCollection","schema":{"geometry":"Polygon","properties":{"a":"float","b":"float"}},"features":[]}"#,
        ),
        (
            "extra_key.geojson",
            r#"{"type":"FeatureCollection","schema":{"geometry":"Polygon","properties":{"pm25":"float"}},
               "features":[{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]},
                            "properties":{"pm25":25.0,"other":1.0}}]}"#,
        ),
        (
            "open_ring.geojson",
            r#"{"type":"FeatureCollection","schema":{"geometry":"Polygon","properties":{"pm25":"float"}},
               "features":[{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1]]]},
                            "properties":{"pm25":25.0}}]}"#,
        ),
        ("not_json.geojson", "garbage"),
    ];

    for (name, body) in cases {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        assert!(
            matches!(read_collection(&path), Err(PlumeError::InvalidFormat { .. })),
            "{} should fail validation",
            name
        );
    }
}

#[test]
fn test_missing_file_is_unavailable() {
    let dir = temp_test_dir();
    assert!(matches!(
        read_collection(&dir.path().join("absent.geojson")),
        Err(PlumeError::DataUnavailable(_))
    ));
}

#[test]
fn test_shapefile_round_trip() {
    let dir = temp_test_dir();
    let path = dir.path().join("pm25_20200615.shp");
    let features = vec![feature(10.0, -5.0), feature(10.0, 5.0), feature(25.0, 0.0)];

    let summary = write_collection(&path, "pm25", &features).unwrap();
    assert_eq!(summary.total, 3);
    for ext in ["shp", "shx", "dbf", "prj"] {
        assert!(path.with_extension(ext).exists(), "missing .{}", ext);
    }
    let prj = fs::read_to_string(path.with_extension("prj")).unwrap();
    assert!(prj.starts_with("GEOGCS[\"GCS_WGS_1984\""));

    let stored = read_collection(&path).unwrap();
    assert_eq!(stored.attribute, "pm25");
    assert_eq!(stored.features.len(), 3);
    for (read, written) in stored.features.iter().zip(&features) {
        assert_eq!(read.level, written.level);
        assert_eq!(read.attribute, "pm25");
        assert_eq!(read.exterior.len(), written.exterior.len());
        assert_eq!(read.exterior.first(), read.exterior.last());
        assert!((read.area() - written.area()).abs() < 1e-9);
        let (a, b) = (read.bbox().unwrap(), written.bbox().unwrap());
        assert_coords_approx_eq!((a.min_x, a.min_y), (b.min_x, b.min_y), 1e-9);
        assert_coords_approx_eq!((a.max_x, a.max_y), (b.max_x, b.max_y), 1e-9);
    }
    assert_eq!(stored.at_level(10.0).count(), 2);
}

#[test]
fn test_shapefile_zero_features() {
    let dir = temp_test_dir();
    let path = dir.path().join("empty.shp");
    let summary = write_collection(&path, "pm25", &[]).unwrap();
    assert_eq!(summary.total, 0);

    let stored = read_collection(&path).unwrap();
    assert_eq!(stored.attribute, "pm25");
    assert!(stored.features.is_empty());
}

#[test]
fn test_shapefile_rewrite_leaves_only_the_set() {
    let dir = temp_test_dir();
    let path = dir.path().join("out.shp");
    write_collection(&path, "pm25", &[feature(10.0, 0.0), feature(25.0, 0.0)]).unwrap();
    write_collection(&path, "pm25", &[feature(25.0, 3.0)]).unwrap();

    let stored = read_collection(&path).unwrap();
    assert_eq!(stored.features.len(), 1);
    assert_eq!(stored.features[0].level, 25.0);

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["out.dbf", "out.prj", "out.shp", "out.shx"]);
}

#[test]
fn test_missing_shapefile_is_unavailable() {
    let dir = temp_test_dir();
    assert!(matches!(
        read_collection(&dir.path().join("absent.shp")),
        Err(PlumeError::DataUnavailable(_))
    ));
}
