//! Conversion of contour rings into polygon features.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use plume_common::geometry::distinct_vertices;
use plume_common::{ContourRing, Coord, PlumeError, PlumeResult, PolygonFeature};

use crate::extract::LevelRings;

/// How rings that do not form a simple polygon are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryPolicy {
    /// Self-intersecting or self-touching rings fail with `InvalidGeometry`.
    #[default]
    Reject,
    /// Self-intersecting rings are written as traced.
    PassThrough,
}

impl FromStr for GeometryPolicy {
    type Err = PlumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(GeometryPolicy::Reject),
            "pass-through" | "passthrough" => Ok(GeometryPolicy::PassThrough),
            other => Err(PlumeError::invalid_parameter(
                "geometry_policy",
                format!("unknown policy '{}', expected reject or pass-through", other),
            )),
        }
    }
}

impl fmt::Display for GeometryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryPolicy::Reject => f.write_str("reject"),
            GeometryPolicy::PassThrough => f.write_str("pass-through"),
        }
    }
}

/// Features built from a set of levels, plus the rings that were refused.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub features: Vec<PolygonFeature>,
    pub rejected: Vec<PlumeError>,
}

/// Builds one [`PolygonFeature`] per valid ring.
#[derive(Debug, Clone)]
pub struct PolygonBuilder {
    attribute: String,
    policy: GeometryPolicy,
}

impl PolygonBuilder {
    pub fn new(attribute: impl Into<String>, policy: GeometryPolicy) -> PlumeResult<Self> {
        let attribute = attribute.into();
        if attribute.trim().is_empty() {
            return Err(PlumeError::invalid_parameter(
                "propname",
                "attribute name must not be empty",
            ));
        }
        Ok(Self { attribute, policy })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn policy(&self) -> GeometryPolicy {
        self.policy
    }

    /// Build a polygon from one ring.
    ///
    /// Vertex order is kept as traced; the first vertex is appended when the
    /// ring is not already closed.
    pub fn build(&self, ring: &ContourRing) -> PlumeResult<PolygonFeature> {
        let invalid = |message: String| PlumeError::InvalidGeometry {
            level: ring.level,
            message,
        };

        if let Some(bad) = ring
            .vertices
            .iter()
            .find(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(invalid(format!("non-finite vertex {:?}", bad)));
        }

        let distinct = distinct_vertices(&ring.vertices);
        if distinct < 3 {
            return Err(invalid(format!("only {} distinct vertices", distinct)));
        }

        let mut exterior = ring.vertices.clone();
        if exterior.first() != exterior.last() {
            exterior.push(exterior[0]);
        }

        if self.policy == GeometryPolicy::Reject {
            if let Some((a, b)) = find_self_intersection(&exterior) {
                return Err(invalid(format!(
                    "ring of {} vertices self-intersects between edges {} and {}",
                    exterior.len(),
                    a,
                    b
                )));
            }
        }

        Ok(PolygonFeature {
            exterior,
            attribute: self.attribute.clone(),
            level: ring.level,
        })
    }

    /// Build features for every level, in level order, collecting the rings
    /// that failed instead of aborting.
    pub fn build_all(&self, levels: &[LevelRings]) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        for entry in levels {
            for ring in &entry.rings {
                match self.build(ring) {
                    Ok(feature) => outcome.features.push(feature),
                    Err(e) => outcome.rejected.push(e),
                }
            }
        }
        outcome
    }
}

/// Find a pair of non-adjacent edges of a closed ring that intersect or
/// touch. Returns their edge indices.
///
/// Edges are swept in order of their minimum x so only pairs with
/// overlapping x ranges are tested.
pub fn find_self_intersection(ring: &[Coord]) -> Option<(usize, usize)> {
    let n = ring.len().saturating_sub(1);
    if n < 4 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    let min_x = |e: usize| ring[e].0.min(ring[e + 1].0);
    let max_x = |e: usize| ring[e].0.max(ring[e + 1].0);
    order.sort_by(|&a, &b| min_x(a).total_cmp(&min_x(b)));

    for (k, &a) in order.iter().enumerate() {
        let a_max = max_x(a);
        for &b in &order[k + 1..] {
            if min_x(b) > a_max {
                break;
            }
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let adjacent = hi == lo + 1 || (lo == 0 && hi == n - 1);
            if adjacent {
                continue;
            }
            if segments_intersect(ring[lo], ring[lo + 1], ring[hi], ring[hi + 1]) {
                return Some((lo, hi));
            }
        }
    }
    None
}

fn orientation(a: Coord, b: Coord, c: Coord) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: Coord, b: Coord, p: Coord) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Closed-segment intersection test, counting touching endpoints.
fn segments_intersect(p1: Coord, p2: Coord, q1: Coord, q2: Coord) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}
