//! Plate carrée map views.

use plume_common::{Coord, Extent, PlumeError, PlumeResult};

/// Wrap a longitude offset into `[-180, 180)`.
pub fn wrap_longitude(x: f64) -> f64 {
    (x + 180.0).rem_euclid(360.0) - 180.0
}

/// Shift `x` by a multiple of 360 so it lies as close as possible to `near`.
fn unwrap_near(x: f64, near: f64) -> f64 {
    x + 360.0 * ((near - x) / 360.0).round()
}

/// Equirectangular projection centred on `central_longitude`, clipped to a
/// geographic extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateCarree {
    central_longitude: f64,
    extent: Extent,
}

impl PlateCarree {
    pub fn new(central_longitude: f64, extent: Extent) -> PlumeResult<Self> {
        if !central_longitude.is_finite() {
            return Err(PlumeError::invalid_parameter(
                "central_longitude",
                "must be finite",
            ));
        }
        extent.validate()?;
        Ok(Self {
            central_longitude,
            extent,
        })
    }

    pub fn central_longitude(&self) -> f64 {
        self.central_longitude
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Projected x range covered by the extent.
    pub fn x_range(&self) -> (f64, f64) {
        let span = self.extent.lon_span().min(360.0);
        let x0 = if span >= 360.0 {
            -180.0
        } else {
            wrap_longitude(self.extent.min_lon - self.central_longitude)
        };
        (x0, x0 + span)
    }

    /// Projected x of a longitude, in `[-180, 180)`.
    pub fn project_lon(&self, lon: f64) -> f64 {
        wrap_longitude(lon - self.central_longitude)
    }
}

impl Default for PlateCarree {
    fn default() -> Self {
        Self {
            central_longitude: 0.0,
            extent: Extent::GLOBAL,
        }
    }
}

/// A projection bound to an image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub projection: PlateCarree,
    pub width: u32,
    pub height: u32,
}

impl MapView {
    pub const DEFAULT_WIDTH: u32 = 1024;

    /// View of the given width; the height follows the extent's aspect ratio.
    pub fn new(projection: PlateCarree, width: u32) -> Self {
        let (x0, x1) = projection.x_range();
        let aspect = projection.extent().lat_span() / (x1 - x0);
        let height = (width as f64 * aspect).round().max(1.0) as u32;
        Self {
            projection,
            width: width.max(1),
            height,
        }
    }

    fn scale(&self) -> (f64, f64) {
        let (x0, x1) = self.projection.x_range();
        (
            self.width as f64 / (x1 - x0),
            self.height as f64 / self.projection.extent().lat_span(),
        )
    }

    /// Pixel position of an already-projected x and a latitude.
    pub fn to_pixel(&self, x: f64, lat: f64) -> (f32, f32) {
        let (x0, _) = self.projection.x_range();
        let (sx, sy) = self.scale();
        let px = (x - x0) * sx;
        let py = (self.projection.extent().max_lat - lat) * sy;
        (px as f32, py as f32)
    }

    /// Pixel positions of a vertex chain.
    ///
    /// Consecutive vertices are unwrapped so no edge jumps across the
    /// dateline seam; the chain starts on the copy nearest the view centre.
    pub fn chain_to_pixels(&self, chain: &[Coord]) -> Vec<(f32, f32)> {
        let (x0, x1) = self.projection.x_range();
        let mut prev = (x0 + x1) / 2.0;
        chain
            .iter()
            .map(|&(lon, lat)| {
                let x = unwrap_near(self.projection.project_lon(lon), prev);
                prev = x;
                self.to_pixel(x, lat)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
    }

    #[test]
    fn test_global_view_size_and_corners() {
        let view = MapView::new(PlateCarree::default(), 1024);
        assert_eq!(view.height, 512);
        let (px, py) = view.to_pixel(-180.0, 90.0);
        assert_eq!((px, py), (0.0, 0.0));
        let (px, py) = view.to_pixel(180.0, -90.0);
        assert_approx_eq!(px, 1024.0, 1e-3);
        assert_approx_eq!(py, 512.0, 1e-3);
    }

    #[test]
    fn test_central_longitude_shifts_x() {
        let proj = PlateCarree::new(180.0, Extent::GLOBAL).unwrap();
        let view = MapView::new(proj, 360);
        // 10E sits just right of the left edge of a dateline-centred map.
        let px = view.chain_to_pixels(&[(10.0, 0.0)]);
        assert_approx_eq!(px[0].0, 10.0, 1e-4);
    }

    #[test]
    fn test_chain_crossing_dateline_stays_contiguous() {
        let proj = PlateCarree::new(180.0, Extent::GLOBAL).unwrap();
        let view = MapView::new(proj, 360);
        let px = view.chain_to_pixels(&[(170.0, 0.0), (-170.0, 0.0)]);
        assert_approx_eq!(px[1].0 - px[0].0, 20.0, 1e-4);
    }

    #[test]
    fn test_regional_extent() {
        let proj = PlateCarree::new(0.0, Extent::from_slice(&[-10.0, 30.0, 30.0, 50.0]).unwrap())
            .unwrap();
        let view = MapView::new(proj, 400);
        assert_eq!(view.height, 200);
        let px = view.chain_to_pixels(&[(10.0, 40.0)]);
        assert_approx_eq!(px[0].0, 200.0, 1e-4);
        assert_approx_eq!(px[0].1, 100.0, 1e-4);
    }
}
