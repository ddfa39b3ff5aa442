//! Filled-plume diagnostic maps read back from a written collection.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tiny_skia::{FillRule, PathBuilder, Pixmap, Transform};
use tracing::info;

use feature_writer::read_collection;
use plume_common::{PlumeError, PlumeResult};

use crate::backdrop::{add_ring, paint, Backdrop};
use crate::png::PngEncoder;
use crate::projection::MapView;
use crate::title::with_title;

/// Plume fill color.
pub const PLUME: [u8; 4] = [255, 0, 0, 255];

/// Outcome of a diagnostic render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub path: PathBuf,
    pub level: f64,
    /// Features drawn (those whose attribute matched the level).
    pub features: usize,
    pub width: u32,
    /// Full image height: the title band plus the map.
    pub height: u32,
}

/// Draw the features of `collection_path` at `level` onto a map and write
/// it to `image_path` as PNG. `title` is drawn in a band above the map and
/// also stored as the image's `Title` text.
///
/// Every failure, including an unreadable collection, is `RenderFailed`.
pub fn render_level(
    collection_path: &Path,
    level: f64,
    image_path: &Path,
    title: &str,
    view: &MapView,
    backdrop: &Backdrop,
) -> PlumeResult<RenderSummary> {
    let failed = |message: String| PlumeError::render_failed(image_path, message);

    let collection = read_collection(collection_path).map_err(|e| failed(e.to_string()))?;

    let mut pixmap = Pixmap::new(view.width, view.height)
        .ok_or_else(|| failed(format!("cannot allocate {}x{} canvas", view.width, view.height)))?;
    backdrop.paint(&mut pixmap, view);

    let mut pb = PathBuilder::new();
    let mut drawn = 0;
    for feature in collection.at_level(level) {
        add_ring(&mut pb, &view.chain_to_pixels(&feature.exterior), true);
        drawn += 1;
    }
    if let Some(path) = pb.finish() {
        pixmap.fill_path(&path, &paint(PLUME), FillRule::Winding, Transform::identity(), None);
    }

    // Every layer is opaque, so the premultiplied buffer is plain RGBA.
    let map = RgbaImage::from_raw(view.width, view.height, pixmap.take())
        .ok_or_else(|| failed("canvas size mismatch".to_string()))?;
    let image = with_title(&map, title);

    let png = PngEncoder::new()
        .with_text("Title", title)
        .with_text("Software", concat!("nc2plume ", env!("CARGO_PKG_VERSION")))
        .encode(image.as_raw(), image.width() as usize, image.height() as usize)
        .map_err(failed)?;

    if let Some(parent) = image_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }
    fs::write(image_path, png).map_err(|e| failed(e.to_string()))?;

    info!(
        path = %image_path.display(),
        level,
        features = drawn,
        title,
        "Rendered diagnostic map"
    );

    Ok(RenderSummary {
        path: image_path.to_path_buf(),
        level,
        features: drawn,
        width: image.width(),
        height: image.height(),
    })
}
