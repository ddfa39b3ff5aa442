//! Tests for PNG encoding.

use renderer::png::{decode_rgba, read_text_chunks, PngEncoder};

fn checkerboard(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                pixels.extend_from_slice(&[255, 0, 0, 255]);
            } else {
                pixels.extend_from_slice(&[152, 183, 226, 255]);
            }
        }
    }
    pixels
}

fn gradient(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8, 255]);
        }
    }
    pixels
}

#[test]
fn test_signature_and_ihdr() {
    let png = PngEncoder::new().encode(&checkerboard(4, 3), 4, 3).unwrap();
    assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(&png[12..16], b"IHDR");
    assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 4);
    assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 3);
    // two colors: indexed
    assert_eq!(png[25], 3);
}

#[test]
fn test_many_colors_fall_back_to_rgba() {
    let png = PngEncoder::new().encode(&gradient(64, 64), 64, 64).unwrap();
    assert_eq!(png[25], 6);
}

#[test]
fn test_pixels_survive_decode() {
    for (pixels, w, h) in [(checkerboard(7, 5), 7, 5), (gradient(40, 30), 40, 30)] {
        let png = PngEncoder::new().encode(&pixels, w, h).unwrap();
        let (dw, dh, decoded) = decode_rgba(&png).unwrap();
        assert_eq!((dw, dh), (w, h));
        assert_eq!(decoded, pixels);
    }
}

#[test]
fn test_title_text_chunk() {
    let png = PngEncoder::new()
        .with_text("Title", "Surface PM2.5 >= 25 ug/m3 (2020-06-15)")
        .encode(&checkerboard(2, 2), 2, 2)
        .unwrap();
    let text = read_text_chunks(&png).unwrap();
    assert_eq!(
        text,
        vec![(
            "Title".to_string(),
            "Surface PM2.5 >= 25 ug/m3 (2020-06-15)".to_string()
        )]
    );
}

#[test]
fn test_non_latin1_title_uses_itxt() {
    let title = "PM2.5 ≥ 25 µg/m³";
    let png = PngEncoder::new()
        .with_text("Title", title)
        .encode(&checkerboard(2, 2), 2, 2)
        .unwrap();
    assert!(png.windows(4).any(|w| w == b"iTXt"));
    assert_eq!(read_text_chunks(&png).unwrap()[0].1, title);
}

#[test]
fn test_corrupted_crc_detected() {
    let mut png = PngEncoder::new().encode(&checkerboard(2, 2), 2, 2).unwrap();
    // flip a byte inside IHDR data
    png[17] ^= 0xFF;
    assert!(read_text_chunks(&png).is_err());
}
