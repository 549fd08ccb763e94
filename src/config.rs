// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide configuration
//!
//! All tunables are read once from the environment at startup and carried in
//! an [`AppConfig`] shared by reference with the pipeline and the detection
//! client. Nothing reads the environment after startup.

use std::env;
use std::path::PathBuf;

/// Configuration for the whole scanning service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory receiving raw uploaded originals
    pub upload_dir: PathBuf,
    /// Directory receiving annotated result images (`result_<filename>`)
    pub detection_dir: PathBuf,
    /// Directory receiving per-detection crops (`cropped_<index>.png`)
    pub cropped_dir: PathBuf,
    /// HTTP listen port
    pub api_port: u16,
    /// Remote detection service settings
    pub detection: DetectionConfig,
    /// OCR engine settings
    pub ocr: OcrConfig,
}

/// Remote object-detection endpoint settings (Roboflow-compatible)
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// API key for the hosted detection endpoint
    pub api_key: String,
    /// Model identifier
    pub model_id: String,
    /// Model version string
    pub model_version: String,
    /// Base URL of the detection service
    pub base_url: String,
    /// Minimum detection confidence sent with each request
    pub confidence: f32,
    /// Overlap (NMS) threshold sent with each request
    pub overlap: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// OCR engine settings
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Path to the ONNX text detection model
    pub det_model_path: PathBuf,
    /// Path to the ONNX text recognition model
    pub rec_model_path: PathBuf,
    /// Path to the character dictionary for CTC decoding
    pub dict_path: PathBuf,
    /// Language passed to the Tesseract fallback engine
    pub tesseract_lang: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            detection_dir: PathBuf::from(
                env::var("DETECTION_DIR").unwrap_or_else(|_| "static/detections".to_string()),
            ),
            cropped_dir: PathBuf::from(
                env::var("CROPPED_DIR").unwrap_or_else(|_| "static/cropped_images".to_string()),
            ),
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            detection: DetectionConfig::from_env(),
            ocr: OcrConfig::from_env(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.detection.validate()
    }

    /// Create the upload/result/crop directories if they do not exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [&self.upload_dir, &self.detection_dir, &self.cropped_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl DetectionConfig {
    /// Load detection settings from environment variables
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("DETECTION_API_KEY").unwrap_or_default(),
            model_id: env::var("DETECTION_MODEL").unwrap_or_default(),
            model_version: env::var("DETECTION_MODEL_VERSION").unwrap_or_else(|_| "1".to_string()),
            base_url: env::var("DETECTION_BASE_URL")
                .unwrap_or_else(|_| "https://detect.roboflow.com".to_string()),
            confidence: 0.5,
            overlap: 0.5,
            timeout_secs: env::var("DETECTION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }

    /// Validate the detection settings
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("DETECTION_API_KEY must be set".to_string());
        }
        if self.model_id.is_empty() {
            return Err("DETECTION_MODEL must be set".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Detection timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Full endpoint URL including model, version and API key
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}/{}?api_key={}",
            self.base_url.trim_end_matches('/'),
            self.model_id,
            self.model_version,
            self.api_key
        )
    }
}

impl OcrConfig {
    /// Load OCR settings from environment variables
    pub fn from_env() -> Self {
        Self {
            det_model_path: PathBuf::from(
                env::var("OCR_DET_MODEL")
                    .unwrap_or_else(|_| "./models/paddleocr-onnx/det_model.onnx".to_string()),
            ),
            rec_model_path: PathBuf::from(
                env::var("OCR_REC_MODEL")
                    .unwrap_or_else(|_| "./models/paddleocr-onnx/rec_model.onnx".to_string()),
            ),
            dict_path: PathBuf::from(
                env::var("OCR_DICT")
                    .unwrap_or_else(|_| "./models/paddleocr-onnx/ppocr_keys_v1.txt".to_string()),
            ),
            tesseract_lang: env::var("TESSERACT_LANG").unwrap_or_else(|_| "eng".to_string()),
        }
    }
}
