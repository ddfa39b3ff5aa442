//! Reading collections back with schema validation.

use std::fs;
use std::path::Path;

use plume_common::{PlumeError, PlumeResult, PolygonFeature};

use crate::esri;
use crate::format::OutputFormat;
use crate::geojson::{FeatureCollection, FLOAT, POLYGON};

/// A collection read from disk, reduced to its exterior rings.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCollection {
    pub attribute: String,
    pub features: Vec<PolygonFeature>,
}

impl StoredCollection {
    /// Features whose level equals `level` within `1e-9`.
    pub fn at_level(&self, level: f64) -> impl Iterator<Item = &PolygonFeature> {
        self.features
            .iter()
            .filter(move |f| (f.level - level).abs() <= 1e-9)
    }
}

/// Read and validate a collection written by [`crate::write_collection`].
///
/// The format follows the extension, as on write.
pub fn read_collection(path: &Path) -> PlumeResult<StoredCollection> {
    match OutputFormat::from_path(path) {
        OutputFormat::Shapefile => esri::read(path),
        OutputFormat::GeoJson => read_geojson(path),
    }
}

/// The schema must declare `Polygon` geometry and exactly one `float`
/// attribute; every feature must be a polygon whose property keys equal the
/// schema's.
fn read_geojson(path: &Path) -> PlumeResult<StoredCollection> {
    let source_name = path.display().to_string();
    let invalid = |message: String| PlumeError::InvalidFormat {
        source_name: source_name.clone(),
        message,
    };

    let bytes = fs::read(path).map_err(|e| {
        PlumeError::DataUnavailable(format!("cannot read {}: {}", path.display(), e))
    })?;
    let collection: FeatureCollection =
        serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

    if collection.type_ != "FeatureCollection" {
        return Err(invalid(format!("unexpected type '{}'", collection.type_)));
    }
    if collection.schema.geometry != POLYGON {
        return Err(invalid(format!(
            "schema geometry is '{}', expected {}",
            collection.schema.geometry, POLYGON
        )));
    }
    let mut attrs = collection.schema.properties.iter();
    let attribute = match (attrs.next(), attrs.next()) {
        (Some((name, kind)), None) if kind == FLOAT => name.clone(),
        _ => {
            return Err(invalid(format!(
                "schema must declare exactly one float attribute, found {:?}",
                collection.schema.properties
            )))
        }
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.into_iter().enumerate() {
        if feature.geometry.type_ != POLYGON {
            return Err(invalid(format!(
                "feature {} has geometry '{}'",
                idx, feature.geometry.type_
            )));
        }
        if !feature
            .properties
            .keys()
            .eq(collection.schema.properties.keys())
        {
            return Err(invalid(format!(
                "feature {} properties {:?} do not match the schema",
                idx,
                feature.properties.keys().collect::<Vec<_>>()
            )));
        }
        let level = feature.properties[&attribute];
        let exterior = match feature.geometry.coordinates.into_iter().next() {
            Some(ring) if ring.len() >= 4 && ring.first() == ring.last() => ring,
            _ => {
                return Err(invalid(format!(
                    "feature {} has no closed exterior ring",
                    idx
                )))
            }
        };
        features.push(PolygonFeature {
            exterior: exterior.into_iter().map(|[x, y]| (x, y)).collect(),
            attribute: attribute.clone(),
            level,
        });
    }

    Ok(StoredCollection {
        attribute,
        features,
    })
}
