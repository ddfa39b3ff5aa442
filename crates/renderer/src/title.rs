//! Title band stacked above a rendered map.

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use tracing::warn;

const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

pub const BAND_BACKGROUND: [u8; 4] = [255, 255, 255, 255];
pub const TITLE_TEXT: [u8; 4] = [0, 0, 0, 255];

/// Height in pixels of the title band for a map `width` pixels wide.
pub fn band_height(width: u32) -> u32 {
    (width / 24).max(20)
}

/// Place `map` under a white band holding `title`, centred.
///
/// If the embedded font cannot be parsed the band is left blank.
pub fn with_title(map: &RgbaImage, title: &str) -> RgbaImage {
    let band = band_height(map.width());
    let mut canvas =
        RgbaImage::from_pixel(map.width(), map.height() + band, Rgba(BAND_BACKGROUND));
    imageops::replace(&mut canvas, map, 0, band as i64);

    if title.trim().is_empty() {
        return canvas;
    }
    let Some(font) = Font::try_from_bytes(FONT_DATA) else {
        warn!("Failed to load title font, leaving the band blank");
        return canvas;
    };

    let scale = Scale::uniform(band as f32 * 0.6);
    let (text_w, text_h) = text_size(scale, &font, title);
    let x = ((canvas.width() as i32 - text_w) / 2).max(2);
    let y = ((band as i32 - text_h) / 2).max(0);
    draw_text_mut(&mut canvas, Rgba(TITLE_TEXT), x, y, scale, &font, title);
    canvas
}
