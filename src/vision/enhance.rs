// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fixed enhancement passes applied to crops before OCR
//!
//! Two modes share the contrast/sharpen front half:
//! - `Crop`: grayscale, contrast x2, sharpen. Feeds the fallback OCR engine.
//! - `Full`: contrast x2, sharpen, binarize at 128. Applied to every crop
//!   before it is persisted.

use image::DynamicImage;

/// Contrast multiplier applied in both modes
const CONTRAST_FACTOR: f32 = 2.0;

/// Binarization cutoff. Strictly-greater comparison: a pixel at exactly 128
/// goes to zero.
const BINARIZE_THRESHOLD: u8 = 128;

/// 3x3 sharpening kernel (weights sum to 1, so flat regions pass through)
const SHARPEN_KERNEL: [f32; 9] = [
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    32.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
];

/// Which enhancement sequence to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceMode {
    /// Grayscale + contrast + sharpen, for in-memory OCR input
    Crop,
    /// Contrast + sharpen + binarize, for persisted crop artifacts
    Full,
}

/// Run the fixed enhancement sequence for the given mode
pub fn enhance(image: &DynamicImage, mode: EnhanceMode) -> DynamicImage {
    match mode {
        EnhanceMode::Crop => {
            let gray = DynamicImage::ImageLuma8(image.to_luma8());
            let contrasted = adjust_contrast(&gray, CONTRAST_FACTOR);
            contrasted.filter3x3(&SHARPEN_KERNEL)
        }
        EnhanceMode::Full => {
            let contrasted = adjust_contrast(image, CONTRAST_FACTOR);
            let sharpened = contrasted.filter3x3(&SHARPEN_KERNEL);
            binarize(&sharpened)
        }
    }
}

/// Scale pixel values away from the mean luminance
///
/// Each channel is remapped as `mean + factor * (p - mean)` where `mean` is
/// the rounded average luminance of the whole image, clamped to u8 range.
fn adjust_contrast(image: &DynamicImage, factor: f32) -> DynamicImage {
    let luma = image.to_luma8();
    let total: u64 = luma.pixels().map(|p| p.0[0] as u64).sum();
    let count = (luma.width() as u64 * luma.height() as u64).max(1);
    let mean = (total as f32 / count as f32 + 0.5).floor();

    let remap = |p: u8| -> u8 { (mean + factor * (p as f32 - mean)).clamp(0.0, 255.0) as u8 };

    match image {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = gray.clone();
            for pixel in out.pixels_mut() {
                pixel.0[0] = remap(pixel.0[0]);
            }
            DynamicImage::ImageLuma8(out)
        }
        other => {
            let mut rgb = other.to_rgb8();
            for pixel in rgb.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    *channel = remap(*channel);
                }
            }
            DynamicImage::ImageRgb8(rgb)
        }
    }
}

/// Threshold every channel: strictly above the cutoff becomes 255, everything
/// else becomes 0
fn binarize(image: &DynamicImage) -> DynamicImage {
    let mut rgb = image.to_rgb8();
    for pixel in rgb.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = if *channel > BINARIZE_THRESHOLD { 255 } else { 0 };
        }
    }
    DynamicImage::ImageRgb8(rgb)
}
