use std::fs;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbImage};

use crate::error::{EvalError, Result};

const METERS_PER_INCH: f64 = 0.0254;
/// PNG signature (8) + IHDR chunk (4 length + 4 type + 13 data + 4 crc).
const IHDR_END: usize = 33;

/// Writes `img` as PNG with a `pHYs` chunk declaring `dpi`.
pub fn save_png(img: &RgbImage, path: &Path, dpi: u32) -> Result<()> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
        .map_err(|source| EvalError::Image { path: path.to_path_buf(), source })?;
    let bytes = with_resolution(bytes, dpi);
    fs::write(path, bytes).map_err(|e| EvalError::io(path, e))
}

/// Splices a `pHYs` chunk right after IHDR. Streams that do not start with
/// IHDR are returned untouched.
fn with_resolution(png: Vec<u8>, dpi: u32) -> Vec<u8> {
    if png.len() < IHDR_END || &png[12..16] != b"IHDR" {
        return png;
    }
    let ppm = (dpi as f64 / METERS_PER_INCH).round() as u32;

    let mut body = Vec::with_capacity(13);
    body.extend_from_slice(b"pHYs");
    body.extend_from_slice(&ppm.to_be_bytes());
    body.extend_from_slice(&ppm.to_be_bytes());
    body.push(1); // unit: meter

    let mut out = Vec::with_capacity(png.len() + 21);
    out.extend_from_slice(&png[..IHDR_END]);
    out.extend_from_slice(&9u32.to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc32(&body).to_be_bytes());
    out.extend_from_slice(&png[IHDR_END..]);
    out
}

/// CRC32 checksum (IEEE polynomial), as required for PNG chunks.
fn crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc = TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFF
}

/// Reads the `pHYs` resolution back as dots per inch, if present.
pub fn read_dpi(png: &[u8]) -> Option<u32> {
    let mut pos = 8;
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes(png[pos..pos + 4].try_into().ok()?) as usize;
        let kind = &png[pos + 4..pos + 8];
        let data = png.get(pos + 8..pos + 8 + len)?;
        if kind == b"pHYs" && len == 9 {
            let ppm = u32::from_be_bytes(data[0..4].try_into().ok()?);
            return Some((ppm as f64 * METERS_PER_INCH).round() as u32);
        }
        if kind == b"IDAT" {
            return None;
        }
        pos += 12 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn crc_of_known_input() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn saved_file_decodes_and_reports_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");
        let img = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        save_png(&img, &path, 200).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(read_dpi(&bytes), Some(200));
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded, img);
    }
}
