// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Optical character recognition
//!
//! Two engines behind one adapter:
//! - `scene` + `detection` + `recognition` - ONNX scene-text pipeline (primary)
//! - `tesseract` - Tesseract block reader (fallback)
//! - `adapter` - runs the primary, falls back on empty output
//! - `preprocessing` - tensor preparation for the ONNX models
//! - `normalize` - whitespace cleanup of engine output

pub mod adapter;
pub mod detection;
pub mod normalize;
pub mod preprocessing;
pub mod recognition;
pub mod scene;
pub mod tesseract;

pub use adapter::{CropRecognizer, OcrAdapter, OcrError, RecognitionOutcome};
pub use detection::{TextDetector, TextRegion};
pub use normalize::normalize_text;
pub use recognition::{RecognizedText, TextRecognizer};
pub use scene::{PaddleSceneReader, SceneTextReader};
pub use tesseract::{BlockTextReader, TesseractReader};
