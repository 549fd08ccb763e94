// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The upload-and-scan endpoint

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{error, info};

use crate::api::errors::ApiError;
use crate::api::http_server::{sanitize_filename, AppState};
use crate::pipeline::PipelineError;
use crate::vision::decode_image_bytes;

use super::response::ScanResponse;

/// POST /upload
///
/// Accepts a multipart form with a single "file" part, persists the upload,
/// runs the scan pipeline, and returns the annotated image URL plus the
/// extracted fields.
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, ApiError> {
    let started = Instant::now();

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read file part: {}", e)))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = upload.ok_or(ApiError::MissingFilePart)?;
    if filename.is_empty() {
        return Err(ApiError::EmptyFilename);
    }
    let filename = sanitize_filename(&filename)?;

    // Reject non-images before anything touches disk
    decode_image_bytes(&data).map_err(|e| ApiError::ValidationError {
        field: "file".to_string(),
        message: e.to_string(),
    })?;

    let upload_path = state.config.upload_dir.join(&filename);
    tokio::fs::write(&upload_path, &data)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to save upload: {}", e)))?;

    info!("Saved upload {} ({} bytes)", filename, data.len());

    let outcome = state.pipeline.process(&upload_path).await.map_err(|e| {
        error!("Scan failed for {}: {}", filename, e);
        match e {
            PipelineError::Detection(inner) => {
                ApiError::ProcessingFailed(format!("Detection failed: {}", inner))
            }
            other => ApiError::InternalError(other.to_string()),
        }
    })?;

    let result_name = file_name_of(&outcome.annotated_image);
    let cropped_images = outcome
        .cropped_images
        .iter()
        .map(|p| format!("/static/cropped_images/{}", file_name_of(p)))
        .collect();

    Ok(Json(ScanResponse {
        original_image: format!("/uploads/{}", filename),
        result_image: format!("/static/detections/{}", result_name),
        units: outcome.fields.units,
        box_no: outcome.fields.box_no,
        cropped_images,
        processing_time_ms: started.elapsed().as_millis() as u64,
    }))
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
