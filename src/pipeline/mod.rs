// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The scan pipeline: detect, annotate, crop, enhance, recognize, aggregate
//!
//! One [`ScanPipeline::process`] call takes a saved upload from detection all
//! the way to the persisted result image, crop artifacts, and extracted
//! fields.

pub mod annotate;
pub mod fields;

pub use annotate::Annotator;
pub use fields::{ClassTexts, FieldMap, FIELD_UNAVAILABLE};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::detection::{DetectionError, ObjectDetector};
use crate::vision::enhance::{enhance, EnhanceMode};
use crate::vision::ocr::CropRecognizer;

/// Terminal output of one pipeline run
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Persisted annotated image (`result_<filename>`)
    pub annotated_image: PathBuf,
    /// Extracted field values
    pub fields: FieldMap,
    /// Persisted crop artifacts, one per detection, in detection order
    pub cropped_images: Vec<PathBuf>,
}

/// Failures that abort a pipeline run
///
/// Per-crop OCR trouble is not here on purpose: a crop that yields no text
/// degrades the field values, it does not fail the scan.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("failed to load image {}: {message}", .path.display())]
    ImageLoad { path: PathBuf, message: String },

    #[error("failed to write artifact {}: {message}", .path.display())]
    ArtifactWrite { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The detection-to-text pipeline
pub struct ScanPipeline {
    detector: Arc<dyn ObjectDetector>,
    recognizer: Arc<dyn CropRecognizer>,
    annotator: Annotator,
    config: Arc<AppConfig>,
}

impl ScanPipeline {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        recognizer: Arc<dyn CropRecognizer>,
        annotator: Annotator,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { detector, recognizer, annotator, config }
    }

    /// Run the full pipeline on a saved upload
    ///
    /// Detection runs first; if the remote call fails, no artifact is written.
    /// Each detection then contributes an annotation on the shared result
    /// image and one enhanced crop, cut from the unannotated original.
    pub async fn process(&self, image_path: &Path) -> Result<ScanOutcome, PipelineError> {
        let filename = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let bytes = tokio::fs::read(image_path).await?;
        let detections = self.detector.detect(&bytes, &filename).await?;
        info!("{}: {} detections", filename, detections.len());

        let original =
            image::load_from_memory(&bytes).map_err(|e| PipelineError::ImageLoad {
                path: image_path.to_path_buf(),
                message: e.to_string(),
            })?;
        let mut annotated = original.to_rgb8();

        let mut class_texts = ClassTexts::default();
        let mut cropped_images = Vec::with_capacity(detections.len());

        for (i, detection) in detections.iter().enumerate() {
            let bbox = detection.bounding_box();
            self.annotator.draw(&mut annotated, &bbox, &detection.class_label);

            let (x, y, w, h) = bbox.crop_rect(original.width(), original.height());
            let crop = original.crop_imm(x, y, w, h);
            let enhanced = enhance(&crop, EnhanceMode::Full);

            let crop_path = self.config.cropped_dir.join(format!("cropped_{}.png", i));
            enhanced.save(&crop_path).map_err(|e| PipelineError::ArtifactWrite {
                path: crop_path.clone(),
                message: e.to_string(),
            })?;

            let text = match self.recognizer.recognize(&crop_path) {
                Ok(outcome) => outcome.into_text(),
                Err(e) => {
                    warn!("OCR failed for crop {} ({}): {}", i, detection.class_label, e);
                    String::new()
                }
            };
            debug!("Crop {} [{}]: {:?}", i, detection.class_label, text);

            class_texts.push(&detection.class_label, text);
            cropped_images.push(crop_path);
        }

        let fields = FieldMap::from_class_texts(&class_texts);

        let result_path = self.config.detection_dir.join(format!("result_{}", filename));
        annotated.save(&result_path).map_err(|e| PipelineError::ArtifactWrite {
            path: result_path.clone(),
            message: e.to_string(),
        })?;

        info!(
            "{}: units={:?} box_no={:?} crops={}",
            filename,
            fields.units,
            fields.box_no,
            cropped_images.len()
        );

        Ok(ScanOutcome { annotated_image: result_path, fields, cropped_images })
    }
}
