// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Whitespace normalization of raw OCR output

/// Collapse all whitespace runs (including newlines) to single spaces and
/// trim the ends
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
