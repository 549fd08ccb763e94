// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the ONNX text detection and recognition models

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the text detection model
pub const DET_INPUT_SIZE: u32 = 640;

/// Fixed input height of the recognition model
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Width cap for recognition inputs
pub const REC_MAX_WIDTH: u32 = 320;

/// ImageNet channel means used by both models
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Normalize an RGB image into an NCHW `[1, 3, H, W]` tensor
fn to_normalized_tensor(rgb: &RgbImage) -> Array4<f32> {
    let (w, h) = rgb.dimensions();
    Array4::from_shape_fn((1, 3, h as usize, w as usize), |(_, c, y, x)| {
        let value = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
        (value - MEAN[c]) / STD[c]
    })
}

/// Prepare an image for the detection model
///
/// Scales to fit a 640x640 square (aspect preserved, gray padding) and
/// normalizes with ImageNet statistics.
pub fn preprocess_for_detection(image: &DynamicImage) -> Array4<f32> {
    let padded = resize_with_padding(image, DET_INPUT_SIZE);
    to_normalized_tensor(&padded.to_rgb8())
}

/// Prepare a cropped text region for the recognition model
///
/// Scales to the fixed model height with a dynamic, capped width.
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let (orig_w, orig_h) = image.dimensions();

    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32)
        .clamp(4, REC_MAX_WIDTH);

    let resized = image.resize_exact(
        new_width,
        REC_INPUT_HEIGHT,
        image::imageops::FilterType::Lanczos3,
    );
    to_normalized_tensor(&resized.to_rgb8())
}

/// Scale an image to fit a square, centered on a gray background
pub fn resize_with_padding(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();
    let mut output = RgbImage::from_pixel(target_size, target_size, Rgb([128, 128, 128]));

    if orig_w == 0 || orig_h == 0 {
        return DynamicImage::ImageRgb8(output);
    }

    let scale =
        (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).max(1);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(1);

    let resized = image
        .resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3)
        .to_rgb8();

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;
    for (x, y, pixel) in resized.enumerate_pixels() {
        output.put_pixel(x + offset_x, y + offset_y, *pixel);
    }

    DynamicImage::ImageRgb8(output)
}

/// Geometry of the letterboxing applied by [`resize_with_padding`], for
/// mapping detections back into original image coordinates
#[derive(Debug, Clone, Copy)]
pub struct PadInfo {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl PadInfo {
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Self { scale: 1.0, offset_x: 0, offset_y: 0 };
        }

        let scale =
            (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).max(1);
        let new_h = ((orig_h as f32 * scale).round() as u32).max(1);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
        }
    }

    /// Map a point from padded model space back to the original image
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.offset_x as f32) / self.scale,
            (y - self.offset_y as f32) / self.scale,
        )
    }
}
