// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface of the scan service
//!
//! Components:
//! - `http_server` - Router, static file serving, health endpoint
//! - `scan` - Upload-and-scan handler and response types
//! - `errors` - API error taxonomy with JSON bodies

pub mod errors;
pub mod http_server;
pub mod scan;

pub use errors::{ApiError, ErrorResponse};
pub use http_server::{build_router, start_server, AppState};
pub use scan::ScanResponse;
