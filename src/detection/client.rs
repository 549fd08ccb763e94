// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client for a Roboflow-compatible hosted detection endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::DetectionConfig;

use super::types::{Detection, DetectionResponse};

/// Errors from the remote detection call
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// The endpoint answered with a non-success status
    #[error("detection service returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never completed (connect failure, timeout, bad payload)
    #[error("detection request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Abstraction over the remote detector, so the pipeline can be exercised
/// without network access
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Submit raw image bytes and return the predicted regions in service
    /// order
    async fn detect(&self, image: &[u8], filename: &str)
        -> Result<Vec<Detection>, DetectionError>;
}

/// Client for a hosted Roboflow-style detection model
pub struct RoboflowClient {
    client: Client,
    endpoint: String,
    confidence: f32,
    overlap: f32,
}

impl RoboflowClient {
    /// Create a new client from the detection configuration
    pub fn new(config: &DetectionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url(),
            confidence: config.confidence,
            overlap: config.overlap,
        })
    }

    /// Endpoint URL this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ObjectDetector for RoboflowClient {
    async fn detect(
        &self,
        image: &[u8],
        filename: &str,
    ) -> Result<Vec<Detection>, DetectionError> {
        let part = Part::bytes(image.to_vec()).file_name(filename.to_string());
        let form = Form::new()
            .part("file", part)
            .text("confidence", self.confidence.to_string())
            .text("overlap", self.overlap.to_string());

        debug!("Detection POST {} ({} bytes)", self.endpoint, image.len());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Detection service returned {}: {}", status, body);
            return Err(DetectionError::Http { status, body });
        }

        let payload: DetectionResponse = response.json().await?;
        debug!("Detection returned {} predictions", payload.predictions.len());

        Ok(payload.predictions)
    }
}
