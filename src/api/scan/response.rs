// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Successful scan result returned to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// URL path of the raw uploaded image
    pub original_image: String,
    /// URL path of the annotated result image
    pub result_image: String,
    /// Aggregated text for the "Units" class, or "N/A"
    pub units: String,
    /// Aggregated text for the "BoxNo" class, or "N/A"
    pub box_no: String,
    /// URL paths of the enhanced crops, in detection order
    pub cropped_images: Vec<String>,
    /// Wall-clock time for the whole scan
    pub processing_time_ms: u64,
}
