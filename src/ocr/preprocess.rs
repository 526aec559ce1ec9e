//! Image preprocessing for OCR
//!
//! Normalizes scans before recognition: grayscale, contrast stretch, gamma
//! lift, sharpen, brightness, and a resize into the band where tesseract
//! performs best. The pipeline is best-effort; if any step fails the
//! original bytes are passed through so a decodable-but-odd image still
//! reaches the engine.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat};

/// Longest side after preprocessing; larger inputs are downscaled.
const MAX_DIMENSION: u32 = 2400;

/// Shortest acceptable longest side; smaller inputs are upscaled.
const MIN_DIMENSION: u32 = 600;

/// Mild midtone lift for faded scans.
const GAMMA: f64 = 1.2;

/// Run the full preprocessing pipeline. Never fails: undecodable input is
/// returned unchanged with a warning.
pub fn preprocess(input: &[u8]) -> Vec<u8> {
    match preprocess_inner(input) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!("image preprocessing failed, using original image: {}", e);
            input.to_vec()
        }
    }
}

fn preprocess_inner(input: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(input)?;

    let mut gray = img.to_luma8();
    stretch_histogram(&mut gray);
    apply_gamma(&mut gray, GAMMA);

    let sharpened = imageops::unsharpen(&gray, 1.5, 1);

    let mut bright = sharpened;
    for px in bright.pixels_mut() {
        let lifted = (px.0[0] as f32 * 1.1).round();
        px.0[0] = lifted.clamp(0.0, 255.0) as u8;
    }

    let resized = resize_into_band(DynamicImage::ImageLuma8(bright));

    let mut output = Vec::new();
    resized.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

/// Linear contrast stretch to the full 0-255 range.
fn stretch_histogram(img: &mut GrayImage) {
    let (mut min, mut max) = (255u8, 0u8);
    for px in img.pixels() {
        min = min.min(px.0[0]);
        max = max.max(px.0[0]);
    }
    if max <= min {
        return;
    }

    let range = (max - min) as f32;
    for px in img.pixels_mut() {
        px.0[0] = (((px.0[0] - min) as f32 / range) * 255.0).round() as u8;
    }
}

fn apply_gamma(img: &mut GrayImage, gamma: f64) {
    let inv = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (v, entry) in lut.iter_mut().enumerate() {
        *entry = (255.0 * (v as f64 / 255.0).powf(inv)).round() as u8;
    }
    for px in img.pixels_mut() {
        px.0[0] = lut[px.0[0] as usize];
    }
}

/// Fit the image into the OCR resolution band: downscale when the longest
/// side exceeds the maximum, upscale when either side falls below the
/// minimum so that both sides end up at or above it. In-band images pass
/// through untouched.
fn resize_into_band(img: DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());

    if w.max(h) > MAX_DIMENSION {
        img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else if w < MIN_DIMENSION || h < MIN_DIMENSION {
        let factor =
            (MIN_DIMENSION as f32 / w as f32).max(MIN_DIMENSION as f32 / h as f32);
        let new_w = (w as f32 * factor).round() as u32;
        let new_h = (h as f32 * factor).round() as u32;
        img.resize_exact(new_w.max(1), new_h.max(1), FilterType::Lanczos3)
    } else {
        img
    }
}

/// Encode a plain light-gray PNG of the given size.
#[cfg(test)]
pub fn test_png(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, image::Luma([200u8]));
    let mut output = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .unwrap();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(png).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_small_image_upscaled() {
        // Scaled by the short side so both dimensions reach the band.
        let out = preprocess(&test_png(120, 80));
        assert_eq!(dimensions(&out), (900, MIN_DIMENSION));
    }

    #[test]
    fn test_short_side_below_band_triggers_upscale() {
        // Wide receipt-style scan: long side already in band, short side
        // not. Both must end up at or above the minimum.
        let out = preprocess(&test_png(800, 300));
        assert_eq!(dimensions(&out), (1600, MIN_DIMENSION));

        let out = preprocess(&test_png(500, 200));
        assert_eq!(dimensions(&out), (1500, MIN_DIMENSION));
    }

    #[test]
    fn test_large_image_downscaled() {
        let out = preprocess(&test_png(4800, 2400));
        let (w, h) = dimensions(&out);
        assert_eq!(w, MAX_DIMENSION);
        assert!(h <= MAX_DIMENSION);
    }

    #[test]
    fn test_in_band_image_keeps_dimensions() {
        let out = preprocess(&test_png(1000, 700));
        assert_eq!(dimensions(&out), (1000, 700));
    }

    #[test]
    fn test_undecodable_input_passes_through() {
        let garbage = b"definitely not an image".to_vec();
        assert_eq!(preprocess(&garbage), garbage);
    }

    #[test]
    fn test_reapplication_stays_in_band() {
        let once = preprocess(&test_png(3000, 2000));
        let twice = preprocess(&once);

        let (w1, h1) = dimensions(&once);
        let (w2, h2) = dimensions(&twice);

        // Normalizing already-normalized output must not drift the
        // resolution out of the target band.
        assert!(w1.max(h1) <= MAX_DIMENSION && w1.max(h1) >= MIN_DIMENSION);
        assert_eq!((w1, h1), (w2, h2));
    }

    #[test]
    fn test_output_is_grayscale_png() {
        let out = preprocess(&test_png(800, 800));
        let img = image::load_from_memory(&out).unwrap();
        // Decodes as 8-bit luma after the pipeline.
        assert!(matches!(img, DynamicImage::ImageLuma8(_)));
    }
}
