// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection overlays on the result image

use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::detection::BoundingBox;

const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Outline thickness in pixels, drawn inward from the box edge
const OUTLINE_WIDTH: i32 = 5;

const LABEL_SCALE: f32 = 16.0;

/// Draws detection outlines and class labels onto the annotation copy
///
/// Label text needs a font; when no system font is available the outlines are
/// still drawn and labels are skipped.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    /// Create an annotator with whichever system font can be found
    pub fn new() -> Self {
        Self { font: load_system_font() }
    }

    /// Create an annotator with an explicit (possibly absent) font
    pub fn with_font(font: Option<FontVec>) -> Self {
        Self { font }
    }

    /// Draw one detection: a red outline plus the class label at the top-left
    /// corner
    pub fn draw(&self, image: &mut RgbImage, bbox: &BoundingBox, label: &str) {
        let x1 = bbox.x1.round() as i32;
        let y1 = bbox.y1.round() as i32;
        let width = (bbox.x2 - bbox.x1).round().max(0.0) as i32;
        let height = (bbox.y2 - bbox.y1).round().max(0.0) as i32;

        for inset in 0..OUTLINE_WIDTH {
            let w = width - 2 * inset;
            let h = height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, rect, OUTLINE_COLOR);
        }

        if let Some(font) = &self.font {
            if !label.is_empty() {
                draw_text_mut(image, OUTLINE_COLOR, x1, y1, LABEL_SCALE, font, label);
            }
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

/// Try a handful of common system font locations
fn load_system_font() -> Option<FontVec> {
    let font_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/System/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in &font_paths {
        if let Ok(font_data) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(font_data) {
                debug!("Loaded annotation font from {}", path);
                return Some(font);
            }
        }
    }

    debug!("No system font found; labels will not be drawn");
    None
}
