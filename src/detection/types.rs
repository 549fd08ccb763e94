// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection wire types and derived geometry

use serde::{Deserialize, Serialize};

/// One labeled region returned by the detection service
///
/// Boxes arrive in center/size form. Parsing is tolerant: a prediction object
/// missing any numeric field, or the class label, still parses with zero /
/// empty defaults instead of failing the whole response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Class label assigned by the model (e.g. "Units", "BoxNo")
    #[serde(rename = "class", default)]
    pub class_label: String,
    /// Box center, x coordinate
    #[serde(default)]
    pub x: f32,
    /// Box center, y coordinate
    #[serde(default)]
    pub y: f32,
    /// Box width
    #[serde(default)]
    pub width: f32,
    /// Box height
    #[serde(default)]
    pub height: f32,
    /// Detection confidence (0.0-1.0)
    #[serde(default)]
    pub confidence: f32,
}

impl Detection {
    /// Corner-coordinate bounding box derived from the center/size form
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x1: self.x - self.width / 2.0,
            y1: self.y - self.height / 2.0,
            x2: self.x + self.width / 2.0,
            y2: self.y + self.height / 2.0,
        }
    }
}

/// Axis-aligned box in corner form, derived from a [`Detection`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Clamp to image bounds and convert to an integer crop rectangle
    /// `(x, y, width, height)`.
    ///
    /// Degenerate boxes still yield a 1x1 rectangle so every detection
    /// produces a crop artifact.
    pub fn crop_rect(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let max_x = image_width.saturating_sub(1) as f32;
        let max_y = image_height.saturating_sub(1) as f32;

        let x = self.x1.clamp(0.0, max_x).floor() as u32;
        let y = self.y1.clamp(0.0, max_y).floor() as u32;
        let x2 = self.x2.clamp(0.0, image_width as f32).ceil() as u32;
        let y2 = self.y2.clamp(0.0, image_height as f32).ceil() as u32;

        let w = x2.saturating_sub(x).max(1).min(image_width.saturating_sub(x).max(1));
        let h = y2.saturating_sub(y).max(1).min(image_height.saturating_sub(y).max(1));

        (x, y, w, h)
    }
}

/// Top-level payload returned by the detection endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionResponse {
    /// Predictions in the order the service reported them
    #[serde(default)]
    pub predictions: Vec<Detection>,
}
