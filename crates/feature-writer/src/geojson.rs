//! GeoJSON types for polygon feature collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use plume_common::PolygonFeature;

/// Geometry type name written to the schema and to every feature.
pub const POLYGON: &str = "Polygon";

/// Attribute type name for level values.
pub const FLOAT: &str = "float";

/// A FeatureCollection carrying its attribute schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub schema: Schema,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// An empty collection with a single float attribute.
    pub fn new(attribute: &str) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            schema: Schema::polygon_with_float(attribute),
            features: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }
}

/// Geometry type and attribute types shared by every feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub geometry: String,
    pub properties: BTreeMap<String, String>,
}

impl Schema {
    pub fn polygon_with_float(attribute: &str) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(attribute.to_string(), FLOAT.to_string());
        Self {
            geometry: POLYGON.to_string(),
            properties,
        }
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: Geometry,

    pub properties: BTreeMap<String, f64>,
}

impl Feature {
    pub fn polygon(exterior: Vec<[f64; 2]>, attribute: &str, level: f64) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(attribute.to_string(), level);
        Self {
            type_: "Feature".to_string(),
            geometry: Geometry {
                type_: POLYGON.to_string(),
                coordinates: vec![exterior],
            },
            properties,
        }
    }
}

impl From<&PolygonFeature> for Feature {
    fn from(feature: &PolygonFeature) -> Self {
        let exterior = feature.exterior.iter().map(|&(x, y)| [x, y]).collect();
        Feature::polygon(exterior, &feature.attribute, feature.level)
    }
}

/// Polygon geometry: the first ring is the exterior, any further rings are
/// holes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub type_: String,

    pub coordinates: Vec<Vec<[f64; 2]>>,
}
