// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server: router, static file serving, health

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as PathParam, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::errors::ApiError;
use crate::api::scan::upload_handler;
use crate::config::AppConfig;
use crate::pipeline::ScanPipeline;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScanPipeline>,
    pub config: Arc<AppConfig>,
}

/// Build the service router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/uploads/:filename", get(serve_upload))
        .route("/static/detections/:filename", get(serve_detection))
        .route("/static/cropped_images/:filename", get(serve_crop))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown
pub async fn start_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.api_port));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Scan service listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    axum::response::Json(json!({
        "status": "healthy",
        "service": "boxscan-node",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn serve_upload(
    State(state): State<AppState>,
    PathParam(filename): PathParam<String>,
) -> Result<Response, ApiError> {
    serve_from(&state.config.upload_dir, &filename).await
}

async fn serve_detection(
    State(state): State<AppState>,
    PathParam(filename): PathParam<String>,
) -> Result<Response, ApiError> {
    serve_from(&state.config.detection_dir, &filename).await
}

async fn serve_crop(
    State(state): State<AppState>,
    PathParam(filename): PathParam<String>,
) -> Result<Response, ApiError> {
    serve_from(&state.config.cropped_dir, &filename).await
}

async fn serve_from(dir: &Path, filename: &str) -> Result<Response, ApiError> {
    let filename = sanitize_filename(filename)?;
    let path = dir.join(&filename);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound(filename.clone()))?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

/// Reject names that could escape the serving directory
pub fn sanitize_filename(filename: &str) -> Result<String, ApiError> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(ApiError::ValidationError {
            field: "filename".to_string(),
            message: format!("Invalid filename: {:?}", filename),
        });
    }
    Ok(filename.to_string())
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
