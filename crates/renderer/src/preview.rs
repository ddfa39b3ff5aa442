//! Raw contour line previews.

use std::fs;
use std::path::Path;

use tiny_skia::{PathBuilder, Pixmap};
use tracing::info;

use plume_common::{BoundingBox, ContourRing, PlumeError, PlumeResult};

use crate::backdrop::{add_ring, rgba, stroke};
use crate::png::PngEncoder;

/// Side of the square preview image in pixels.
pub const PREVIEW_SIZE: u32 = 500;

const MARGIN: f32 = 20.0;

/// Viridis anchors, sampled linearly per level.
const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

/// Line color for level `index` of `count`.
pub fn level_color(index: usize, count: usize) -> [u8; 4] {
    let t = if count <= 1 {
        0.0
    } else {
        index as f32 / (count - 1) as f32
    };
    let pos = t * (VIRIDIS.len() - 1) as f32;
    let lo = (pos.floor() as usize).min(VIRIDIS.len() - 1);
    let hi = (lo + 1).min(VIRIDIS.len() - 1);
    let f = pos - lo as f32;
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * f).round() as u8;
    [
        mix(VIRIDIS[lo][0], VIRIDIS[hi][0]),
        mix(VIRIDIS[lo][1], VIRIDIS[hi][1]),
        mix(VIRIDIS[lo][2], VIRIDIS[hi][2]),
        255,
    ]
}

/// Stroke traced rings over the field's bounding box, one color per level,
/// and write the image to `image_path`. Returns the number of rings drawn.
pub fn render_contour_preview(
    rings: &[ContourRing],
    bbox: BoundingBox,
    image_path: &Path,
) -> PlumeResult<usize> {
    let failed = |message: String| PlumeError::render_failed(image_path, message);
    if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
        return Err(failed(format!("empty bounding box {:?}", bbox)));
    }

    let mut pixmap = Pixmap::new(PREVIEW_SIZE, PREVIEW_SIZE)
        .ok_or_else(|| failed("cannot allocate canvas".to_string()))?;
    pixmap.fill(rgba([255, 255, 255, 255]));

    let inner = PREVIEW_SIZE as f32 - 2.0 * MARGIN;
    let to_px = |(lon, lat): (f64, f64)| {
        let x = MARGIN + ((lon - bbox.min_x) / bbox.width()) as f32 * inner;
        let y = MARGIN + ((bbox.max_y - lat) / bbox.height()) as f32 * inner;
        (x, y)
    };

    let mut frame = PathBuilder::new();
    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
        (bbox.min_x, bbox.max_y),
    ];
    add_ring(&mut frame, &corners.map(to_px), true);
    if let Some(path) = frame.finish() {
        stroke(&mut pixmap, &path, [0, 0, 0, 255], 1.0);
    }

    let mut levels: Vec<f64> = Vec::new();
    for ring in rings {
        if !levels.contains(&ring.level) {
            levels.push(ring.level);
        }
    }

    for (index, level) in levels.iter().enumerate() {
        let mut pb = PathBuilder::new();
        for ring in rings.iter().filter(|r| r.level == *level) {
            let points: Vec<(f32, f32)> = ring.vertices.iter().copied().map(to_px).collect();
            add_ring(&mut pb, &points, ring.closed);
        }
        if let Some(path) = pb.finish() {
            stroke(&mut pixmap, &path, level_color(index, levels.len()), 1.5);
        }
    }

    let png = PngEncoder::new()
        .with_text("Title", "Contour preview")
        .encode(pixmap.data(), PREVIEW_SIZE as usize, PREVIEW_SIZE as usize)
        .map_err(failed)?;
    if let Some(parent) = image_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }
    fs::write(image_path, png).map_err(|e| failed(e.to_string()))?;

    info!(path = %image_path.display(), rings = rings.len(), levels = levels.len(), "Contour figure written");
    Ok(rings.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_color_endpoints() {
        assert_eq!(level_color(0, 1), [68, 1, 84, 255]);
        assert_eq!(level_color(0, 3), [68, 1, 84, 255]);
        assert_eq!(level_color(2, 3), [253, 231, 37, 255]);
        assert_eq!(level_color(1, 3), [33, 145, 140, 255]);
    }
}
