// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use boxscan_node::{
    api::{start_server, AppState},
    config::AppConfig,
    detection::RoboflowClient,
    pipeline::{Annotator, ScanPipeline},
    vision::ocr::{OcrAdapter, PaddleSceneReader, TesseractReader},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    config
        .ensure_directories()
        .context("Failed to create storage directories")?;

    tracing::info!(
        "Storage ready: uploads={}, detections={}, crops={}",
        config.upload_dir.display(),
        config.detection_dir.display(),
        config.cropped_dir.display()
    );

    let detector = RoboflowClient::new(&config.detection)
        .context("Failed to build detection client")?;

    let primary = PaddleSceneReader::new(&config.ocr)
        .context("Failed to initialize primary OCR engine")?;
    let fallback = TesseractReader::new(config.ocr.tesseract_lang.clone());
    let recognizer = OcrAdapter::new(Box::new(primary), Box::new(fallback));

    let config = Arc::new(config);
    let pipeline = ScanPipeline::new(
        Arc::new(detector),
        Arc::new(recognizer),
        Annotator::new(),
        config.clone(),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        config,
    };

    start_server(state)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
