// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-scan endpoint: handler and response types

pub mod handler;
pub mod response;

pub use handler::upload_handler;
pub use response::ScanResponse;
