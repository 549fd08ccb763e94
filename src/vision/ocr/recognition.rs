// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX text recognition with CTC decoding

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::io::BufRead;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::REC_INPUT_HEIGHT;

/// Recognized text for one region
#[derive(Debug, Clone)]
pub struct RecognizedText {
    pub text: String,
    /// Mean per-character probability
    pub confidence: f32,
}

impl RecognizedText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Text recognition model backed by an ONNX Runtime session
///
/// Decodes the model's per-timestep character distribution with greedy CTC
/// against a character dictionary loaded at startup.
#[derive(Clone)]
pub struct TextRecognizer {
    session: Arc<Mutex<Session>>,
    input_name: String,
    dictionary: Arc<Vec<char>>,
}

impl std::fmt::Debug for TextRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRecognizer")
            .field("input_name", &self.input_name)
            .field("dictionary_size", &self.dictionary.len())
            .finish_non_exhaustive()
    }
}

impl TextRecognizer {
    /// Load the recognition model and its character dictionary
    pub fn new<P: AsRef<Path>>(model_path: P, dict_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Text recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!("Character dictionary not found: {}", dict_path.display());
        }

        info!("Loading text recognition model from {}", model_path.display());

        let dictionary = load_dictionary(dict_path)?;
        debug!("Loaded character dictionary with {} entries", dictionary.len());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load recognition model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            dictionary: Arc::new(dictionary),
        })
    }

    /// Recognize text in a preprocessed `[1, 3, 48, W]` tensor
    pub fn recognize(&self, input: &Array4<f32>) -> Result<RecognizedText> {
        let shape = input.shape();
        if shape.len() != 4
            || shape[0] != 1
            || shape[1] != 3
            || shape[2] != REC_INPUT_HEIGHT as usize
            || shape[3] < 4
        {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, W>=4]",
                shape,
                REC_INPUT_HEIGHT
            );
        }

        let mut session = self.session.lock().unwrap();

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let (text, confidence) = ctc_greedy_decode(&logits.view(), &self.dictionary)?;
        Ok(RecognizedText { text, confidence })
    }
}

/// Load the CTC character dictionary
///
/// Index 0 is reserved for the blank token; each file line contributes one
/// character, and a space entry is appended when the file lacks one.
fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<char>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("Failed to open dictionary: {}", path.as_ref().display()))?;

    let mut dictionary = vec!['\0'];
    for line in std::io::BufReader::new(file).lines() {
        let line = line.context("Failed to read dictionary line")?;
        if let Some(ch) = line.chars().next() {
            dictionary.push(ch);
        }
    }

    if !dictionary.contains(&' ') {
        dictionary.push(' ');
    }

    Ok(dictionary)
}

/// Greedy (best-path) CTC decoding
///
/// Takes a `[1, T, C]` or `[T, C]` distribution, picks the argmax class per
/// timestep, collapses repeats and drops blanks (class 0). Returns the decoded
/// text and the mean probability of the kept characters.
pub fn ctc_greedy_decode(output: &ArrayViewD<f32>, dictionary: &[char]) -> Result<(String, f32)> {
    let shape = output.shape();
    let (seq_len, num_classes) = match shape.len() {
        3 => (shape[1], shape[2]),
        2 => (shape[0], shape[1]),
        _ => anyhow::bail!("Unexpected recognition output shape: {:?}", shape),
    };

    let prob_at = |t: usize, c: usize| -> f32 {
        if shape.len() == 3 {
            output[IxDyn(&[0, t, c])]
        } else {
            output[IxDyn(&[t, c])]
        }
    };

    let mut text = String::new();
    let mut kept = 0usize;
    let mut total = 0.0f32;
    let mut prev: Option<usize> = None;

    for t in 0..seq_len {
        let mut best = 0usize;
        let mut best_prob = f32::NEG_INFINITY;
        for c in 0..num_classes {
            let prob = prob_at(t, c);
            if prob > best_prob {
                best_prob = prob;
                best = c;
            }
        }

        if best != 0 && prev != Some(best) {
            if let Some(ch) = dictionary.get(best) {
                text.push(*ch);
                kept += 1;
                total += best_prob;
            }
        }

        // A blank separates repeated characters
        prev = if best == 0 { None } else { Some(best) };
    }

    let confidence = if kept == 0 {
        0.0
    } else {
        (total / kept as f32).min(1.0)
    };

    Ok((text, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use std::io::Write;

    fn dict() -> Vec<char> {
        vec!['\0', 'a', 'b', 'c', '1', '2']
    }

    fn logits(rows: &[&[f32]]) -> ndarray::ArrayD<f32> {
        let t = rows.len();
        let c = rows[0].len();
        let mut out = Array::zeros(IxDyn(&[1, t, c]));
        for (ti, row) in rows.iter().enumerate() {
            for (ci, &v) in row.iter().enumerate() {
                out[IxDyn(&[0, ti, ci])] = v;
            }
        }
        out
    }

    #[test]
    fn test_decode_simple_sequence() {
        let output = logits(&[
            &[0.1, 0.9, 0.0, 0.0, 0.0, 0.0], // a
            &[0.1, 0.0, 0.8, 0.0, 0.0, 0.0], // b
            &[0.1, 0.0, 0.0, 0.7, 0.0, 0.0], // c
        ]);
        let (text, confidence) = ctc_greedy_decode(&output.view(), &dict()).unwrap();
        assert_eq!(text, "abc");
        assert!((confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_decode_collapses_repeats() {
        let output = logits(&[
            &[0.1, 0.9, 0.0, 0.0, 0.0, 0.0], // a
            &[0.1, 0.9, 0.0, 0.0, 0.0, 0.0], // a (repeat, collapsed)
            &[0.1, 0.0, 0.9, 0.0, 0.0, 0.0], // b
        ]);
        let (text, _) = ctc_greedy_decode(&output.view(), &dict()).unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_decode_blank_separates_repeats() {
        let output = logits(&[
            &[0.1, 0.9, 0.0, 0.0, 0.0, 0.0], // a
            &[0.9, 0.1, 0.0, 0.0, 0.0, 0.0], // blank
            &[0.1, 0.9, 0.0, 0.0, 0.0, 0.0], // a again
        ]);
        let (text, _) = ctc_greedy_decode(&output.view(), &dict()).unwrap();
        assert_eq!(text, "aa");
    }

    #[test]
    fn test_decode_all_blank() {
        let output = logits(&[
            &[0.9, 0.1, 0.0, 0.0, 0.0, 0.0],
            &[0.9, 0.1, 0.0, 0.0, 0.0, 0.0],
        ]);
        let (text, confidence) = ctc_greedy_decode(&output.view(), &dict()).unwrap();
        assert!(text.is_empty());
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_decode_2d_output_shape() {
        let mut output = Array::zeros(IxDyn(&[2, 6]));
        output[IxDyn(&[0, 4])] = 0.9; // 1
        output[IxDyn(&[1, 5])] = 0.9; // 2
        let (text, _) = ctc_greedy_decode(&output.view(), &dict()).unwrap();
        assert_eq!(text, "12");
    }

    #[test]
    fn test_decode_index_outside_dictionary_skipped() {
        let small_dict = vec!['\0', 'a'];
        let output = logits(&[&[0.1, 0.2, 0.0, 0.0, 0.0, 0.9]]);
        let (text, _) = ctc_greedy_decode(&output.view(), &small_dict).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_load_dictionary_reserves_blank() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a").unwrap();
        writeln!(file, "b").unwrap();
        writeln!(file, "1").unwrap();
        let dictionary = load_dictionary(file.path()).unwrap();
        assert_eq!(dictionary[0], '\0');
        assert_eq!(dictionary[1], 'a');
        assert_eq!(dictionary[3], '1');
        // Space appended since the file has none
        assert!(dictionary.contains(&' '));
    }

    #[test]
    fn test_missing_model_file() {
        let dict_file = tempfile::NamedTempFile::new().unwrap();
        let result = TextRecognizer::new(
            Path::new("/nonexistent/rec_model.onnx"),
            dict_file.path(),
        );
        assert!(result.is_err());
    }
}
