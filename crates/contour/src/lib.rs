//! Contour extraction for gridded fields.
//!
//! [`ContourExtractor`] traces every requested level with a [`ContourTracer`]
//! (marching squares by default) and maps the chains to (lon, lat) rings.
//! [`PolygonBuilder`] turns those rings into closed polygon features tagged
//! with their level.

pub mod extract;
pub mod polygon;
pub mod tracer;

pub use extract::{dedup_levels, ContourExtractor, LevelRings};
pub use polygon::{find_self_intersection, BuildOutcome, GeometryPolicy, PolygonBuilder};
pub use tracer::{ContourTracer, GridPoint, GridRing, MarchingSquares};
