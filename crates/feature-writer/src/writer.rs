//! Atomic collection writes.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use plume_common::{PlumeError, PlumeResult, PolygonFeature};

use crate::esri;
use crate::format::OutputFormat;
use crate::geojson::{Feature, FeatureCollection};
use crate::summary::CollectionSummary;

/// Write `features` to `path` as one collection with a single float
/// attribute named `attribute`, in the format the extension selects.
///
/// The collection is serialized to temporary files next to `path` and
/// renamed over it, so readers never see a partial file. Missing parent
/// directories are created. A collection with no features is valid.
///
/// Every feature must carry `attribute`; anything else is rejected before
/// the file is touched.
pub fn write_collection(
    path: &Path,
    attribute: &str,
    features: &[PolygonFeature],
) -> PlumeResult<CollectionSummary> {
    if let Some(stray) = features.iter().find(|f| f.attribute != attribute) {
        return Err(PlumeError::invalid_parameter(
            "propname",
            format!(
                "feature attribute '{}' does not match schema attribute '{}'",
                stray.attribute, attribute
            ),
        ));
    }

    let format = OutputFormat::from_path(path);
    if format == OutputFormat::Shapefile {
        esri::field_name(attribute)?;
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| PlumeError::write_failed(path, e))?;

    match format {
        OutputFormat::Shapefile => esri::write(dir, path, attribute, features)?,
        OutputFormat::GeoJson => write_geojson(dir, path, attribute, features)?,
    }

    let summary = CollectionSummary::from_features(path.to_path_buf(), attribute, features);
    info!(
        path = %path.display(),
        format = %format,
        features = summary.total,
        levels = summary.per_level.len(),
        "Wrote feature collection"
    );
    Ok(summary)
}

fn write_geojson(
    dir: &Path,
    path: &Path,
    attribute: &str,
    features: &[PolygonFeature],
) -> PlumeResult<()> {
    let collection = FeatureCollection::new(attribute)
        .with_features(features.iter().map(Feature::from).collect());

    let tmp = NamedTempFile::new_in(dir).map_err(|e| PlumeError::write_failed(path, e))?;
    debug!(tmp = %tmp.path().display(), target = %path.display(), "Writing collection");

    {
        let mut out = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut out, &collection)
            .map_err(|e| PlumeError::write_failed(path, e))?;
        out.flush().map_err(|e| PlumeError::write_failed(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| PlumeError::write_failed(path, e))?;
    tmp.persist(path)
        .map_err(|e| PlumeError::write_failed(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(attribute: &str, level: f64) -> PolygonFeature {
        PolygonFeature {
            exterior: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
            attribute: attribute.to_string(),
            level,
        }
    }

    #[test]
    fn test_mismatched_attribute_rejected_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let err = write_collection(&path, "pm25", &[square("no2", 10.0)]).unwrap_err();
        assert!(matches!(err, PlumeError::InvalidParameter { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_long_attribute_rejected_for_shapefile_only() {
        let dir = tempfile::tempdir().unwrap();
        let attribute = "pm25_rh35_gcc";
        let shp = dir.path().join("out.shp");
        let err = write_collection(&shp, attribute, &[square(attribute, 10.0)]).unwrap_err();
        assert!(matches!(err, PlumeError::InvalidParameter { ref param, .. } if param == "propname"));
        assert!(!shp.exists());

        let json = dir.path().join("out.geojson");
        write_collection(&json, attribute, &[square(attribute, 10.0)]).unwrap();
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/out.geojson");
        write_collection(&path, "pm25", &[square("pm25", 10.0)]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_target_is_write_failed() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.geojson");
        let err = write_collection(&path, "pm25", &[]).unwrap_err();
        match err {
            PlumeError::WriteFailed { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
