//! Bounding boxes and map extents.

use serde::{Deserialize, Serialize};

use crate::error::{PlumeError, PlumeResult};

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounding box of a set of (x, y) points.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Self::new(x, y, x, y),
                Some(b) => Self::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if two bounding boxes intersect (touching counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Map extent in the order `[min_lon, max_lon, min_lat, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Extent {
    /// The whole globe.
    pub const GLOBAL: Extent = Extent {
        min_lon: -180.0,
        max_lon: 180.0,
        min_lat: -90.0,
        max_lat: 90.0,
    };

    /// Build an extent from a four-element slice, validating ordering and
    /// latitude range.
    pub fn from_slice(values: &[f64]) -> PlumeResult<Self> {
        let [min_lon, max_lon, min_lat, max_lat] = values else {
            return Err(PlumeError::invalid_parameter(
                "extent",
                format!("expected 4 values, got {}", values.len()),
            ));
        };
        let extent = Self {
            min_lon: *min_lon,
            max_lon: *max_lon,
            min_lat: *min_lat,
            max_lat: *max_lat,
        };
        extent.validate()?;
        Ok(extent)
    }

    pub fn validate(&self) -> PlumeResult<()> {
        if !(self.max_lon > self.min_lon) {
            return Err(PlumeError::invalid_parameter(
                "extent",
                format!("max_lon {} must exceed min_lon {}", self.max_lon, self.min_lon),
            ));
        }
        if !(self.max_lat > self.min_lat) || self.min_lat < -90.0 || self.max_lat > 90.0 {
            return Err(PlumeError::invalid_parameter(
                "extent",
                format!("latitude range [{}, {}] is invalid", self.min_lat, self.max_lat),
            ));
        }
        Ok(())
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl From<BoundingBox> for Extent {
    fn from(b: BoundingBox) -> Self {
        Self {
            min_lon: b.min_x,
            max_lon: b.max_x,
            min_lat: b.min_y,
            max_lat: b.max_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_from_slice() {
        let e = Extent::from_slice(&[-120.0, 240.0, -80.0, 80.0]).unwrap();
        assert_eq!(e.lon_span(), 360.0);
        assert_eq!(e.lat_span(), 160.0);

        assert!(Extent::from_slice(&[0.0, 1.0, 2.0]).is_err());
        assert!(Extent::from_slice(&[10.0, 0.0, -10.0, 10.0]).is_err());
        assert!(Extent::from_slice(&[0.0, 10.0, -95.0, 10.0]).is_err());
    }

    #[test]
    fn test_bbox_from_points() {
        let b = BoundingBox::from_points([(1.0, 2.0), (-3.0, 5.0), (0.0, -1.0)]).unwrap();
        assert_eq!(b, BoundingBox::new(-3.0, -1.0, 1.0, 5.0));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
        assert!(b.intersects(&BoundingBox::new(1.0, 5.0, 2.0, 6.0)));
        assert!(!b.intersects(&BoundingBox::new(1.5, 5.0, 2.0, 6.0)));
    }
}
