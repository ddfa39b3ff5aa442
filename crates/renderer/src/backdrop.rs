//! Map backdrop: ocean, land polygons with coastline, graticule.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tiny_skia::{Color, FillRule, Paint, Path as SkPath, PathBuilder, Pixmap, Stroke, Transform};
use tracing::debug;

use plume_common::{Coord, PlumeError, PlumeResult};

use crate::projection::MapView;

pub const OCEAN: [u8; 4] = [152, 183, 226, 255];
pub const LAND: [u8; 4] = [240, 240, 220, 255];
pub const COASTLINE: [u8; 4] = [0, 0, 0, 255];
pub const GRATICULE: [u8; 4] = [110, 110, 110, 255];

/// Coarse world land outlines with the Black and Caspian seas as holes.
const BUILTIN_LAND: &str = include_str!("../assets/land_coarse.geojson");

/// Graticule spacing in degrees.
pub const GRATICULE_STEP: f64 = 30.0;

/// Background layers drawn under the plume polygons.
#[derive(Debug, Clone, Default)]
pub struct Backdrop {
    land: Vec<Vec<Coord>>,
}

impl Backdrop {
    /// Ocean and graticule only.
    pub fn ocean_only() -> Self {
        Self::default()
    }

    /// Land from the embedded coarse world outlines.
    pub fn builtin() -> PlumeResult<Self> {
        let doc: Value =
            serde_json::from_str(BUILTIN_LAND).map_err(|e| PlumeError::InvalidFormat {
                source_name: "builtin land".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_geojson(&doc))
    }

    fn from_geojson(doc: &Value) -> Self {
        let mut land = Vec::new();
        collect_rings(doc, &mut land);
        Self { land }
    }

    /// Load land polygons from a GeoJSON file.
    ///
    /// Accepts a FeatureCollection, a single Feature or a bare geometry;
    /// `Polygon` and `MultiPolygon` geometries contribute rings, anything else
    /// is skipped.
    pub fn with_land_file(path: &Path) -> PlumeResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            PlumeError::DataUnavailable(format!("cannot read land file {}: {}", path.display(), e))
        })?;
        let doc: Value = serde_json::from_slice(&bytes).map_err(|e| PlumeError::InvalidFormat {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        let backdrop = Self::from_geojson(&doc);
        debug!(path = %path.display(), rings = backdrop.land.len(), "Loaded land polygons");
        Ok(backdrop)
    }

    pub fn land_rings(&self) -> &[Vec<Coord>] {
        &self.land
    }

    /// Paint every layer onto `pixmap`.
    pub fn paint(&self, pixmap: &mut Pixmap, view: &MapView) {
        pixmap.fill(rgba(OCEAN));

        if !self.land.is_empty() {
            let mut pb = PathBuilder::new();
            for ring in &self.land {
                add_ring(&mut pb, &view.chain_to_pixels(ring), true);
            }
            if let Some(path) = pb.finish() {
                pixmap.fill_path(&path, &paint(LAND), FillRule::EvenOdd, Transform::identity(), None);
                stroke(pixmap, &path, COASTLINE, 0.6);
            }
        }

        if let Some(path) = graticule(view) {
            stroke(pixmap, &path, GRATICULE, 0.5);
        }
    }
}

fn collect_rings(value: &Value, out: &mut Vec<Vec<Coord>>) {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            for feature in value["features"].as_array().into_iter().flatten() {
                collect_rings(feature, out);
            }
        }
        Some("Feature") => collect_rings(&value["geometry"], out),
        Some("Polygon") => push_polygon(&value["coordinates"], out),
        Some("MultiPolygon") => {
            for polygon in value["coordinates"].as_array().into_iter().flatten() {
                push_polygon(polygon, out);
            }
        }
        _ => {}
    }
}

fn push_polygon(rings: &Value, out: &mut Vec<Vec<Coord>>) {
    for ring in rings.as_array().into_iter().flatten() {
        let coords: Vec<Coord> = ring
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|p| Some((p.get(0)?.as_f64()?, p.get(1)?.as_f64()?)))
            .collect();
        if coords.len() >= 3 {
            out.push(coords);
        }
    }
}

fn graticule(view: &MapView) -> Option<SkPath> {
    let extent = view.projection.extent();
    let mut pb = PathBuilder::new();

    let mut lon = -180.0;
    while lon <= 180.0 {
        let line = [(lon, extent.min_lat), (lon, extent.max_lat)];
        add_ring(&mut pb, &view.chain_to_pixels(&line), false);
        lon += GRATICULE_STEP;
    }

    let (x0, x1) = view.projection.x_range();
    let mut lat = -90.0;
    while lat <= 90.0 {
        if lat > extent.min_lat && lat < extent.max_lat {
            let (left, y) = view.to_pixel(x0, lat);
            let (right, _) = view.to_pixel(x1, lat);
            pb.move_to(left, y);
            pb.line_to(right, y);
        }
        lat += GRATICULE_STEP;
    }
    pb.finish()
}

pub(crate) fn add_ring(pb: &mut PathBuilder, points: &[(f32, f32)], close: bool) {
    let Some((&(x, y), rest)) = points.split_first() else {
        return;
    };
    pb.move_to(x, y);
    for &(x, y) in rest {
        pb.line_to(x, y);
    }
    if close {
        pb.close();
    }
}

pub(crate) fn rgba(c: [u8; 4]) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], c[3])
}

pub(crate) fn paint(c: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(c[0], c[1], c[2], c[3]);
    paint.anti_alias = true;
    paint
}

pub(crate) fn stroke(pixmap: &mut Pixmap, path: &SkPath, color: [u8; 4], width: f32) {
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &paint(color), &stroke, Transform::identity(), None);
}
