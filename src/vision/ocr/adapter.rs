// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-engine OCR with fallback
//!
//! The primary scene-text engine reads the persisted crop file. Only when it
//! returns no text at all does the secondary engine get a try, on the
//! in-memory grayscale-enhanced copy. Engine failures are errors; an engine
//! that runs and finds nothing is not.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::vision::enhance::{enhance, EnhanceMode};

use super::normalize::normalize_text;
use super::scene::SceneTextReader;
use super::tesseract::BlockTextReader;

/// Result of running OCR over one crop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Normalized, non-empty text
    Found(String),
    /// Both engines ran and produced nothing
    Empty,
}

impl RecognitionOutcome {
    /// The recognized text, empty for [`RecognitionOutcome::Empty`]
    pub fn into_text(self) -> String {
        match self {
            RecognitionOutcome::Found(text) => text,
            RecognitionOutcome::Empty => String::new(),
        }
    }
}

/// OCR failures, distinct from "no text found"
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to open crop image {}: {source}", .path.display())]
    OpenImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("primary OCR engine failed: {0}")]
    Primary(#[source] anyhow::Error),

    #[error("fallback OCR engine failed: {0}")]
    Fallback(#[source] anyhow::Error),
}

/// Text recognition over one persisted crop
pub trait CropRecognizer: Send + Sync {
    fn recognize(&self, crop_path: &Path) -> Result<RecognitionOutcome, OcrError>;
}

/// Primary + fallback engine pair
pub struct OcrAdapter {
    primary: Box<dyn SceneTextReader>,
    fallback: Box<dyn BlockTextReader>,
}

impl OcrAdapter {
    pub fn new(primary: Box<dyn SceneTextReader>, fallback: Box<dyn BlockTextReader>) -> Self {
        Self { primary, fallback }
    }
}

impl CropRecognizer for OcrAdapter {
    fn recognize(&self, crop_path: &Path) -> Result<RecognitionOutcome, OcrError> {
        let image = image::open(crop_path).map_err(|source| OcrError::OpenImage {
            path: crop_path.to_path_buf(),
            source,
        })?;

        // Prepared up front for the fallback; the primary engine works from
        // the file itself and never sees this copy.
        let enhanced = enhance(&image, EnhanceMode::Crop);

        let fragments = self
            .primary
            .read_fragments(crop_path)
            .map_err(OcrError::Primary)?;
        let joined = normalize_text(&fragments.join(" "));
        if !joined.is_empty() {
            debug!("Primary OCR: {:?}", joined);
            return Ok(RecognitionOutcome::Found(joined));
        }

        debug!("Primary OCR found nothing, trying fallback");
        let raw = self.fallback.read_block(&enhanced).map_err(OcrError::Fallback)?;
        let normalized = normalize_text(&raw);
        if normalized.is_empty() {
            Ok(RecognitionOutcome::Empty)
        } else {
            Ok(RecognitionOutcome::Found(normalized))
        }
    }
}
