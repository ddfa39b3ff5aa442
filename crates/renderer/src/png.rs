//! PNG encoding for RGBA image data.
//!
//! Diagnostic maps use a handful of flat colors, so the encoder writes an
//! indexed PNG (color type 3) whenever the image has at most 256 distinct
//! colors and falls back to RGBA (color type 6) otherwise. Text metadata is
//! written as `tEXt` chunks, or `iTXt` when the value is not Latin-1.

use std::collections::HashMap;
use std::io::{Read, Write};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// PNG writer with optional text metadata.
#[derive(Debug, Clone, Default)]
pub struct PngEncoder {
    text: Vec<(String, String)>,
}

impl PngEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a text chunk, e.g. `("Title", "...")`.
    pub fn with_text(mut self, keyword: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.push((keyword.into(), value.into()));
        self
    }

    /// Encode RGBA pixels (4 bytes per pixel, row-major).
    pub fn encode(&self, pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
        if width == 0 || height == 0 {
            return Err(format!("invalid image size {}x{}", width, height));
        }
        if pixels.len() != width * height * 4 {
            return Err(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                width * height * 4,
                width,
                height,
                pixels.len()
            ));
        }

        let mut png = Vec::new();
        png.extend_from_slice(&SIGNATURE);

        let rows = match extract_palette(pixels) {
            Some((palette, indices)) => {
                write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));
                write_palette(&mut png, &palette);
                scanlines(&indices, width, height, 1)
            }
            None => {
                write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
                scanlines(pixels, width, height, 4)
            }
        };

        for (keyword, value) in &self.text {
            write_text(&mut png, keyword, value)?;
        }

        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder
            .write_all(&rows)
            .map_err(|e| format!("IDAT compression failed: {}", e))?;
        let idat = encoder
            .finish()
            .map_err(|e| format!("IDAT compression failed: {}", e))?;
        write_chunk(&mut png, b"IDAT", &idat);
        write_chunk(&mut png, b"IEND", &[]);

        Ok(png)
    }
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&(width as u32).to_be_bytes());
    data.extend_from_slice(&(height as u32).to_be_bytes());
    data.push(8); // bit depth
    data.push(color_type);
    data.push(0); // compression method
    data.push(0); // filter method
    data.push(0); // interlace method
    data
}

fn write_palette(png: &mut Vec<u8>, palette: &[[u8; 4]]) {
    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(png, b"PLTE", &plte);
    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(png, b"tRNS", &trns);
    }
}

/// Prefix each row with filter byte 0 (none).
fn scanlines(data: &[u8], width: usize, height: usize, bytes_per_pixel: usize) -> Vec<u8> {
    let stride = width * bytes_per_pixel;
    let mut out = Vec::with_capacity(height * (1 + stride));
    for row in data.chunks_exact(stride) {
        out.push(0);
        out.extend_from_slice(row);
    }
    out
}

/// Palette and per-pixel indices, or `None` past 256 colors.
fn extract_palette(pixels: &[u8]) -> Option<(Vec<[u8; 4]>, Vec<u8>)> {
    let mut lookup: HashMap<[u8; 4], u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let color = [px[0], px[1], px[2], px[3]];
        let index = match lookup.get(&color) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push(color);
                lookup.insert(color, idx);
                idx
            }
        };
        indices.push(index);
    }
    Some((palette, indices))
}

fn write_text(png: &mut Vec<u8>, keyword: &str, value: &str) -> Result<(), String> {
    if keyword.is_empty() || keyword.len() > 79 || !keyword.bytes().all(|b| (32..=126).contains(&b))
    {
        return Err(format!("invalid text keyword '{}'", keyword));
    }
    let mut data = keyword.as_bytes().to_vec();
    data.push(0);
    if value.chars().all(|c| (c as u32) <= 0xFF) {
        data.extend(value.chars().map(|c| c as u8));
        write_chunk(png, b"tEXt", &data);
    } else {
        // compression flag, method, empty language tag, empty translation
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(value.as_bytes());
        write_chunk(png, b"iTXt", &data);
    }
    Ok(())
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Iterate over `(type, data)` of every chunk, checking CRCs.
fn chunks(png: &[u8]) -> Result<Vec<([u8; 4], &[u8])>, String> {
    if png.len() < 8 || png[..8] != SIGNATURE {
        return Err("missing PNG signature".to_string());
    }
    let mut out = Vec::new();
    let mut pos = 8;
    while pos + 12 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let end = pos + 12 + len;
        if end > png.len() {
            return Err("truncated chunk".to_string());
        }
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&png[pos + 4..pos + 8]);
        let data = &png[pos + 8..pos + 8 + len];
        let crc = u32::from_be_bytes([png[end - 4], png[end - 3], png[end - 2], png[end - 1]]);
        if crc32fast::hash(&png[pos + 4..pos + 8 + len]) != crc {
            return Err(format!("CRC mismatch in {}", String::from_utf8_lossy(&kind)));
        }
        out.push((kind, data));
        pos = end;
    }
    Ok(out)
}

/// Text metadata stored in a PNG, in file order.
pub fn read_text_chunks(png: &[u8]) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    for (kind, data) in chunks(png)? {
        let Some(nul) = data.iter().position(|&b| b == 0) else {
            continue;
        };
        let keyword = String::from_utf8_lossy(&data[..nul]).into_owned();
        match &kind {
            b"tEXt" => {
                let value = data[nul + 1..].iter().map(|&b| b as char).collect();
                out.push((keyword, value));
            }
            b"iTXt" if data.len() >= nul + 5 => {
                let value = String::from_utf8_lossy(&data[nul + 5..]).into_owned();
                out.push((keyword, value));
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Decode a PNG produced by [`PngEncoder`] back to RGBA pixels.
///
/// Only the layouts this module writes are supported: 8-bit indexed or RGBA,
/// non-interlaced, filter type 0.
pub fn decode_rgba(png: &[u8]) -> Result<(usize, usize, Vec<u8>), String> {
    let mut header = None;
    let mut palette: Vec<[u8; 4]> = Vec::new();
    let mut idat = Vec::new();

    for (kind, data) in chunks(png)? {
        match &kind {
            b"IHDR" if data.len() == 13 => {
                let w = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
                let h = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
                header = Some((w, h, data[9]));
            }
            b"PLTE" => {
                palette = data.chunks_exact(3).map(|c| [c[0], c[1], c[2], 255]).collect();
            }
            b"tRNS" => {
                for (entry, &alpha) in palette.iter_mut().zip(data) {
                    entry[3] = alpha;
                }
            }
            b"IDAT" => idat.extend_from_slice(data),
            _ => {}
        }
    }

    let (width, height, color_type) = header.ok_or("missing IHDR")?;
    let bpp = match color_type {
        3 => 1,
        6 => 4,
        other => return Err(format!("unsupported color type {}", other)),
    };

    let mut raw = Vec::new();
    flate2::read::ZlibDecoder::new(idat.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| format!("IDAT decompression failed: {}", e))?;
    let stride = width * bpp;
    if raw.len() != height * (stride + 1) {
        return Err("unexpected IDAT length".to_string());
    }

    let mut pixels = Vec::with_capacity(width * height * 4);
    for row in raw.chunks_exact(stride + 1) {
        if row[0] != 0 {
            return Err(format!("unsupported filter type {}", row[0]));
        }
        if bpp == 4 {
            pixels.extend_from_slice(&row[1..]);
        } else {
            for &idx in &row[1..] {
                let color = palette
                    .get(idx as usize)
                    .ok_or_else(|| format!("palette index {} out of range", idx))?;
                pixels.extend_from_slice(color);
            }
        }
    }
    Ok((width, height, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_simple() {
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            255, 0, 0, 255, // red again
        ];
        let (palette, indices) = extract_palette(&pixels).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(indices, vec![0, 1, 0]);
    }

    #[test]
    fn test_extract_palette_overflow() {
        let pixels: Vec<u8> = (0..300u32)
            .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 0, 255])
            .collect();
        assert!(extract_palette(&pixels).is_none());
    }

    #[test]
    fn test_text_keyword_validation() {
        let encoder = PngEncoder::new().with_text("", "x");
        assert!(encoder.encode(&[0, 0, 0, 255], 1, 1).is_err());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        assert!(PngEncoder::new().encode(&[0; 12], 2, 2).is_err());
    }
}
