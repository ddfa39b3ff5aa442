//! Common types and utilities shared across the plume extraction crates.

pub mod error;
pub mod extent;
pub mod field;
pub mod geometry;
pub mod time;

pub use error::{PlumeError, PlumeResult};
pub use extent::{BoundingBox, Extent};
pub use field::{GriddedField, Reducer};
pub use geometry::{ContourRing, Coord, PolygonFeature};
pub use time::{AnalysisWindow, CfTimeUnits};
