//! Contour rings and polygon features in (longitude, latitude) space.

use std::collections::HashSet;

use crate::extent::BoundingBox;

/// A (longitude, latitude) vertex.
pub type Coord = (f64, f64);

/// An ordered vertex chain traced at one threshold level.
///
/// `closed` records whether tracing returned to its starting point; chains
/// that hit the grid boundary or missing data come out open and are closed
/// by the polygon builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourRing {
    pub level: f64,
    pub vertices: Vec<Coord>,
    pub closed: bool,
}

impl ContourRing {
    pub fn new(level: f64, vertices: Vec<Coord>, closed: bool) -> Self {
        Self {
            level,
            vertices,
            closed,
        }
    }

    /// Number of distinct vertices (the closing duplicate is not counted).
    pub fn distinct_vertices(&self) -> usize {
        distinct_vertices(&self.vertices)
    }

    /// Area enclosed by the implicitly closed ring.
    pub fn area(&self) -> f64 {
        signed_area(&self.vertices).abs()
    }

    /// Whether the ring cannot form a polygon: fewer than three distinct
    /// vertices or no enclosed area.
    pub fn is_degenerate(&self) -> bool {
        const MIN_AREA: f64 = 1e-12;
        self.distinct_vertices() < 3 || self.area() < MIN_AREA
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().copied())
    }
}

/// One polygon built from one contour ring, tagged with its level under a
/// named attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    /// Exterior ring, explicitly closed (first vertex == last vertex).
    pub exterior: Vec<Coord>,
    pub attribute: String,
    pub level: f64,
}

impl PolygonFeature {
    pub fn area(&self) -> f64 {
        signed_area(&self.exterior).abs()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.exterior.iter().copied())
    }
}

/// Shoelace area of a ring; positive for counter-clockwise order.
///
/// The ring is treated as closed whether or not the last vertex repeats the
/// first.
pub fn signed_area(ring: &[Coord]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let n = ring.len();
    let sum: f64 = (0..n)
        .map(|k| {
            let (x1, y1) = ring[k];
            let (x2, y2) = ring[(k + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();
    sum / 2.0
}

/// Count distinct vertices by exact coordinate value.
pub fn distinct_vertices(ring: &[Coord]) -> usize {
    ring.iter()
        .map(|(x, y)| (x.to_bits(), y.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}
