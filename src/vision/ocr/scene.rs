// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scene-text reading: detection + recognition over a whole image

use anyhow::{Context, Result};
use image::GenericImageView;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::OcrConfig;

use super::detection::TextDetector;
use super::preprocessing::{preprocess_for_detection, preprocess_for_recognition, PadInfo, DET_INPUT_SIZE};
use super::recognition::TextRecognizer;

/// Primary OCR engine: reads an image file and returns the text fragments it
/// finds, in reading order
///
/// Takes a path rather than a decoded image; the engine works from the
/// persisted artifact.
pub trait SceneTextReader: Send + Sync {
    fn read_fragments(&self, path: &Path) -> Result<Vec<String>>;
}

/// Scene-text reader built from ONNX detection and recognition models
pub struct PaddleSceneReader {
    detector: TextDetector,
    recognizer: TextRecognizer,
}

impl PaddleSceneReader {
    /// Load both models from the configured paths
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let detector = TextDetector::new(&config.det_model_path)
            .context("Failed to load text detection model")?;
        let recognizer =
            TextRecognizer::new(&config.rec_model_path, &config.dict_path)
                .context("Failed to load text recognition model")?;
        Ok(Self { detector, recognizer })
    }
}

impl SceneTextReader for PaddleSceneReader {
    fn read_fragments(&self, path: &Path) -> Result<Vec<String>> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;
        let (img_w, img_h) = image.dimensions();

        let tensor = preprocess_for_detection(&image);
        let regions = self.detector.detect(&tensor)?;
        debug!("{} text regions in {}", regions.len(), path.display());

        let pad = PadInfo::new(&image, DET_INPUT_SIZE);
        let mut fragments = Vec::new();

        for region in regions {
            // Map the region corners back into original image space
            let (x1, y1) = pad.map_to_original(region.x, region.y);
            let (x2, y2) =
                pad.map_to_original(region.x + region.width, region.y + region.height);

            let x = x1.max(0.0) as u32;
            let y = y1.max(0.0) as u32;
            if x >= img_w || y >= img_h {
                continue;
            }
            let w = (x2.min(img_w as f32) as u32).saturating_sub(x).max(1);
            let h = (y2.min(img_h as f32) as u32).saturating_sub(y).max(1);

            let crop = image.crop_imm(x, y, w, h);
            let rec_input = preprocess_for_recognition(&crop);

            match self.recognizer.recognize(&rec_input) {
                Ok(recognized) if !recognized.is_empty() => {
                    fragments.push(recognized.text);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Recognition failed for region at ({}, {}): {}", x, y, e);
                }
            }
        }

        Ok(fragments)
    }
}
