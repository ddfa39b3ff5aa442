//! ESRI Shapefile collections.
//!
//! One `Polygon` shape per feature and a single numeric DBF column named
//! after the attribute, sized like a GIS `float` field (24 wide, 15
//! decimals). A WGS84 `.prj` is written alongside.

use std::fs;
use std::path::Path;

use shapefile::dbase::{self, FieldName, FieldType, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use tracing::debug;

use plume_common::geometry::signed_area;
use plume_common::{PlumeError, PlumeResult, PolygonFeature};

use crate::reader::StoredCollection;

const FIELD_LENGTH: u8 = 24;
const FIELD_DECIMALS: u8 = 15;

/// DBF column names hold at most 10 bytes.
const MAX_FIELD_NAME: usize = 10;

/// Files moved into place before the `.shp` itself.
const SIDECARS: [&str; 3] = ["dbf", "shx", "prj"];

const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

/// Validate `attribute` as a DBF column name.
pub fn field_name(attribute: &str) -> PlumeResult<FieldName> {
    let invalid = || {
        PlumeError::invalid_parameter(
            "propname",
            format!(
                "'{}' is not a valid attribute column (ASCII, at most {} characters)",
                attribute, MAX_FIELD_NAME
            ),
        )
    };
    if attribute.len() > MAX_FIELD_NAME || !attribute.is_ascii() {
        return Err(invalid());
    }
    FieldName::try_from(attribute).map_err(|_| invalid())
}

fn to_polygon(feature: &PolygonFeature) -> Polygon {
    let mut points: Vec<Point> = feature
        .exterior
        .iter()
        .map(|&(x, y)| Point::new(x, y))
        .collect();
    // Outer rings are clockwise in a shapefile.
    if signed_area(&feature.exterior) > 0.0 {
        points.reverse();
    }
    Polygon::new(PolygonRing::Outer(points))
}

/// Write the shapefile set for `path` inside a staging directory in `dir`,
/// then rename each file over its target.
pub(crate) fn write(
    dir: &Path,
    path: &Path,
    attribute: &str,
    features: &[PolygonFeature],
) -> PlumeResult<()> {
    let name = field_name(attribute)?;
    let staging = tempfile::Builder::new()
        .prefix(".plume-")
        .tempdir_in(dir)
        .map_err(|e| PlumeError::write_failed(path, e))?;
    let staged = staging.path().join("collection.shp");
    debug!(staging = %staging.path().display(), target = %path.display(), "Writing shapefile");

    {
        let table = TableWriterBuilder::new().add_numeric_field(name, FIELD_LENGTH, FIELD_DECIMALS);
        let mut writer = shapefile::Writer::from_path(&staged, table)
            .map_err(|e| PlumeError::write_failed(path, e))?;
        for feature in features {
            let mut record = Record::default();
            record.insert(attribute.to_string(), FieldValue::Numeric(Some(feature.level)));
            writer
                .write_shape_and_record(&to_polygon(feature), &record)
                .map_err(|e| PlumeError::write_failed(path, e))?;
        }
        // dropping the writer finalizes the headers
    }
    fs::write(staged.with_extension("prj"), WGS84_PRJ)
        .map_err(|e| PlumeError::write_failed(path, e))?;

    for ext in SIDECARS {
        let target = path.with_extension(ext);
        fs::rename(staged.with_extension(ext), &target)
            .map_err(|e| PlumeError::write_failed(&target, e))?;
    }
    fs::rename(&staged, path).map_err(|e| PlumeError::write_failed(path, e))?;
    Ok(())
}

/// Read a shapefile set written by [`write`].
///
/// The attribute table must hold exactly one numeric column and every shape
/// must be a polygon with a single closed outer ring.
pub(crate) fn read(path: &Path) -> PlumeResult<StoredCollection> {
    let source_name = path.display().to_string();
    let invalid = |message: String| PlumeError::InvalidFormat {
        source_name: source_name.clone(),
        message,
    };

    if !path.exists() {
        return Err(PlumeError::DataUnavailable(format!(
            "cannot read {}: no such file",
            source_name
        )));
    }

    let table = dbase::Reader::from_path(path.with_extension("dbf"))
        .map_err(|e| invalid(format!("attribute table: {}", e)))?;
    let attribute = match table.fields() {
        [field] if matches!(field.field_type(), FieldType::Numeric | FieldType::Float) => {
            field.name().to_string()
        }
        fields => {
            return Err(invalid(format!(
                "attribute table must hold exactly one numeric column, found {:?}",
                fields.iter().map(|f| f.name()).collect::<Vec<_>>()
            )))
        }
    };

    let shapes = shapefile::read_as::<_, Polygon, Record>(path)
        .map_err(|e| invalid(e.to_string()))?;

    let mut features = Vec::with_capacity(shapes.len());
    for (idx, (polygon, record)) in shapes.into_iter().enumerate() {
        let exterior: Vec<(f64, f64)> = match polygon.rings() {
            [PolygonRing::Outer(points)] => points.iter().map(|p| (p.x, p.y)).collect(),
            rings => {
                return Err(invalid(format!(
                    "feature {} has {} rings, expected one outer ring",
                    idx,
                    rings.len()
                )))
            }
        };
        if exterior.len() < 4 || exterior.first() != exterior.last() {
            return Err(invalid(format!("feature {} has no closed exterior ring", idx)));
        }
        let level = match record.get(&attribute) {
            Some(FieldValue::Numeric(Some(v))) => *v,
            Some(FieldValue::Float(Some(v))) => f64::from(*v),
            other => {
                return Err(invalid(format!(
                    "feature {} has no value for '{}': {:?}",
                    idx, attribute, other
                )))
            }
        };
        features.push(PolygonFeature {
            exterior,
            attribute: attribute.clone(),
            level,
        });
    }

    Ok(StoredCollection {
        attribute,
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_limits() {
        assert!(field_name("pm25").is_ok());
        assert!(field_name("pm25_rh35_gcc").is_err());
        assert!(field_name("pm2µ").is_err());
    }

    #[test]
    fn test_outer_ring_is_clockwise() {
        let ccw = PolygonFeature {
            exterior: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
            attribute: "pm25".to_string(),
            level: 25.0,
        };
        let polygon = to_polygon(&ccw);
        let ring: Vec<(f64, f64)> = polygon.rings()[0]
            .points()
            .iter()
            .map(|p| (p.x, p.y))
            .collect();
        assert!(signed_area(&ring) < 0.0);
    }
}
