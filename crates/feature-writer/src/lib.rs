//! Polygon feature collections on disk.
//!
//! The default format is an ESRI Shapefile: polygon shapes plus a DBF table
//! with one numeric column holding each feature's level. Paths ending in
//! `.geojson` or `.json` are written as GeoJSON `FeatureCollection`s with an
//! extra `schema` member declaring the geometry type and the attribute
//! types:
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "schema": {"geometry": "Polygon", "properties": {"pm25": "float"}},
//!   "features": [ ... ]
//! }
//! ```
//!
//! [`write_collection`] replaces the target files atomically;
//! [`read_collection`] validates every feature against the schema.

pub mod esri;
pub mod format;
pub mod geojson;
pub mod reader;
pub mod summary;
pub mod writer;

pub use format::OutputFormat;
pub use geojson::{Feature, FeatureCollection, Geometry, Schema};
pub use reader::{read_collection, StoredCollection};
pub use summary::CollectionSummary;
pub use writer::write_collection;
