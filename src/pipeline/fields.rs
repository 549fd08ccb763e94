// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-class text aggregation and the extracted field map

use serde::Serialize;

/// Sentinel for a field whose class was never detected
pub const FIELD_UNAVAILABLE: &str = "N/A";

/// Recognized texts grouped by detection class label
///
/// Labels keep first-seen order; texts within a label keep detection order.
/// Empty texts are kept so every crop of a class participates in the join.
#[derive(Debug, Default)]
pub struct ClassTexts {
    entries: Vec<(String, Vec<String>)>,
}

impl ClassTexts {
    pub fn push(&mut self, label: &str, text: String) {
        if let Some((_, texts)) = self.entries.iter_mut().find(|(l, _)| l == label) {
            texts.push(text);
        } else {
            self.entries.push((label.to_string(), vec![text]));
        }
    }

    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }
}

/// The two extracted fields, each an aggregated string or `N/A`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub units: String,
    pub box_no: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            units: FIELD_UNAVAILABLE.to_string(),
            box_no: FIELD_UNAVAILABLE.to_string(),
        }
    }
}

impl FieldMap {
    /// Map known class labels onto fields
    ///
    /// Texts of a class are space-joined and end-trimmed. Only the two known
    /// labels (and their lowercase variants) populate fields, and only with a
    /// non-empty aggregate; anything else leaves the sentinel in place. A
    /// later synonym label ("units" after "Units") overwrites.
    pub fn from_class_texts(class_texts: &ClassTexts) -> Self {
        let mut fields = Self::default();

        for (label, texts) in class_texts.entries() {
            let aggregated = texts.join(" ").trim().to_string();
            if aggregated.is_empty() {
                continue;
            }
            match label.as_str() {
                "Units" | "units" => fields.units = aggregated,
                "BoxNo" | "boxno" => fields.box_no = aggregated,
                _ => {}
            }
        }

        fields
    }
}
