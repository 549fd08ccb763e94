// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod detection;
pub mod pipeline;
pub mod vision;

// Re-export main types
pub use config::{AppConfig, DetectionConfig, OcrConfig};
pub use detection::{BoundingBox, Detection, DetectionError, ObjectDetector, RoboflowClient};
pub use pipeline::{FieldMap, PipelineError, ScanOutcome, ScanPipeline};
pub use vision::ocr::{
    BlockTextReader, CropRecognizer, OcrAdapter, OcrError, RecognitionOutcome, SceneTextReader,
};
