// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote object detection
//!
//! Components:
//! - `types` - Wire format of the detection service and derived geometry
//! - `client` - Multipart HTTP client for a Roboflow-compatible endpoint

pub mod client;
pub mod types;

pub use client::{DetectionError, ObjectDetector, RoboflowClient};
pub use types::{BoundingBox, Detection, DetectionResponse};
