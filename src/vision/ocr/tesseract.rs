// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tesseract fallback engine (via leptess)

use anyhow::{Context, Result};
use image::DynamicImage;
use leptess::{LepTess, Variable};

/// Secondary OCR engine: reads one uniform block of text from an in-memory
/// image
pub trait BlockTextReader: Send + Sync {
    fn read_block(&self, image: &DynamicImage) -> Result<String>;
}

/// Tesseract-backed block reader
///
/// A fresh engine is initialized per call; `LepTess` holds raw C state and is
/// not shareable across threads.
pub struct TesseractReader {
    lang: String,
}

impl TesseractReader {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

impl BlockTextReader for TesseractReader {
    fn read_block(&self, image: &DynamicImage) -> Result<String> {
        let mut tesseract = LepTess::new(None, &self.lang)
            .context("Failed to initialize Tesseract. Is Tesseract installed?")?;

        // PSM 6: assume a single uniform block of text
        tesseract
            .set_variable(Variable::TesseditPagesegMode, "6")
            .context("Failed to set page segmentation mode")?;

        // leptess wants image data in an encoded format
        let mut png_bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .context("Failed to encode image as PNG")?;

        tesseract
            .set_image_from_mem(&png_bytes)
            .context("Failed to load image into Tesseract")?;

        // Must be set after the image
        tesseract.set_source_resolution(300);

        tesseract
            .get_utf8_text()
            .context("Failed to extract text from image")
    }
}
