// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX text detection
//!
//! Runs a PP-OCR style detection model that outputs a per-pixel text
//! probability map, then groups high-probability pixels into axis-aligned
//! regions.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Probability cutoff for a pixel to count as text
const TEXT_PIXEL_THRESHOLD: f32 = 0.3;

/// Connected regions smaller than this many pixels are noise
const MIN_REGION_PIXELS: usize = 10;

/// One detected text region, in model input coordinates
#[derive(Debug, Clone, Copy)]
pub struct TextRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Text detection model backed by an ONNX Runtime session
///
/// CPU-only; the session is shared behind a mutex so one loaded model can
/// serve concurrent requests.
#[derive(Clone)]
pub struct TextDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for TextDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDetector")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl TextDetector {
    /// Load the detection model from an ONNX file
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("Text detection model not found: {}", model_path.display());
        }

        info!("Loading text detection model from {}", model_path.display());

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
                format!("Failed to load detection model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Detection model input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Run detection on a preprocessed `[1, 3, H, W]` tensor
    ///
    /// Returned regions are in reading order (top to bottom, then left to
    /// right) and expressed in the coordinates of the input tensor.
    pub fn detect(&self, input: &Array4<f32>) -> Result<Vec<TextRegion>> {
        let shape = input.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let mut session = self.session.lock().unwrap();

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let probability_map = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract probability map")?;

        let regions = regions_from_probability_map(
            &probability_map.view(),
            TEXT_PIXEL_THRESHOLD,
            shape[3],
            shape[2],
        )?;

        debug!("Detected {} text regions", regions.len());
        Ok(regions)
    }
}

/// Group text pixels of a probability map into regions
///
/// Accepts `[1, 1, H, W]` or `[1, H, W]` maps. Pixels at or above `threshold`
/// are flood-filled into 4-connected components; components below the minimum
/// size are dropped. Regions are scaled from map space to
/// `input_width` x `input_height` and sorted top-to-bottom, left-to-right.
pub fn regions_from_probability_map(
    map: &ArrayViewD<f32>,
    threshold: f32,
    input_width: usize,
    input_height: usize,
) -> Result<Vec<TextRegion>> {
    let shape = map.shape();
    let (map_height, map_width) = match shape.len() {
        4 => (shape[2], shape[3]),
        3 => (shape[1], shape[2]),
        _ => anyhow::bail!("Unexpected probability map shape: {:?}", shape),
    };

    let prob_at = |x: usize, y: usize| -> f32 {
        if shape.len() == 4 {
            map[IxDyn(&[0, 0, y, x])]
        } else {
            map[IxDyn(&[0, y, x])]
        }
    };

    let scale_x = input_width as f32 / map_width as f32;
    let scale_y = input_height as f32 / map_height as f32;

    let mut visited = vec![false; map_width * map_height];
    let mut regions = Vec::new();

    for y in 0..map_height {
        for x in 0..map_width {
            if visited[y * map_width + x] || prob_at(x, y) < threshold {
                continue;
            }

            // Flood fill the 4-connected component starting here
            let mut stack = vec![(x, y)];
            let (mut min_x, mut max_x, mut min_y, mut max_y) = (x, x, y, y);
            let mut count = 0usize;
            let mut sum_prob = 0.0f32;

            while let Some((cx, cy)) = stack.pop() {
                if visited[cy * map_width + cx] {
                    continue;
                }
                let prob = prob_at(cx, cy);
                if prob < threshold {
                    continue;
                }

                visited[cy * map_width + cx] = true;
                count += 1;
                sum_prob += prob;
                min_x = min_x.min(cx);
                max_x = max_x.max(cx);
                min_y = min_y.min(cy);
                max_y = max_y.max(cy);

                if cx > 0 {
                    stack.push((cx - 1, cy));
                }
                if cx + 1 < map_width {
                    stack.push((cx + 1, cy));
                }
                if cy > 0 {
                    stack.push((cx, cy - 1));
                }
                if cy + 1 < map_height {
                    stack.push((cx, cy + 1));
                }
            }

            if count > MIN_REGION_PIXELS {
                regions.push(TextRegion {
                    x: min_x as f32 * scale_x,
                    y: min_y as f32 * scale_y,
                    width: (max_x - min_x + 1) as f32 * scale_x,
                    height: (max_y - min_y + 1) as f32 * scale_y,
                    confidence: sum_prob / count as f32,
                });
            }
        }
    }

    regions.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn map_with_blocks(blocks: &[(usize, usize, usize, usize)]) -> ndarray::ArrayD<f32> {
        // 64x64 probability map with rectangular text blocks set to 0.9
        let mut map = Array::zeros(IxDyn(&[1, 1, 64, 64]));
        for &(x, y, w, h) in blocks {
            for yy in y..y + h {
                for xx in x..x + w {
                    map[IxDyn(&[0, 0, yy, xx])] = 0.9;
                }
            }
        }
        map
    }

    #[test]
    fn test_empty_map_yields_no_regions() {
        let map = map_with_blocks(&[]);
        let regions =
            regions_from_probability_map(&map.view(), 0.3, 640, 640).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_single_block_detected() {
        let map = map_with_blocks(&[(10, 20, 8, 4)]);
        let regions =
            regions_from_probability_map(&map.view(), 0.3, 64, 64).unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.x, 10.0);
        assert_eq!(region.y, 20.0);
        assert_eq!(region.width, 8.0);
        assert_eq!(region.height, 4.0);
        assert!((region.confidence - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_tiny_region_dropped() {
        // 3x3 = 9 pixels, below the minimum region size
        let map = map_with_blocks(&[(5, 5, 3, 3)]);
        let regions =
            regions_from_probability_map(&map.view(), 0.3, 64, 64).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_regions_sorted_in_reading_order() {
        let map = map_with_blocks(&[(40, 30, 8, 4), (5, 30, 8, 4), (5, 5, 8, 4)]);
        let regions =
            regions_from_probability_map(&map.view(), 0.3, 64, 64).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!((regions[0].x, regions[0].y), (5.0, 5.0));
        assert_eq!((regions[1].x, regions[1].y), (5.0, 30.0));
        assert_eq!((regions[2].x, regions[2].y), (40.0, 30.0));
    }

    #[test]
    fn test_scaling_to_input_space() {
        let map = map_with_blocks(&[(10, 10, 8, 8)]);
        // Map is 64x64, input is 640x640: everything scales by 10
        let regions =
            regions_from_probability_map(&map.view(), 0.3, 640, 640).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].x, 100.0);
        assert_eq!(regions[0].width, 80.0);
    }

    #[test]
    fn test_3d_map_shape_accepted() {
        let mut map = Array::zeros(IxDyn(&[1, 64, 64]));
        for yy in 10..16 {
            for xx in 10..20 {
                map[IxDyn(&[0, yy, xx])] = 0.8;
            }
        }
        let regions =
            regions_from_probability_map(&map.view(), 0.3, 64, 64).unwrap();
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn test_bad_map_shape_rejected() {
        let map: ndarray::ArrayD<f32> = Array::zeros(IxDyn(&[64, 64]));
        assert!(regions_from_probability_map(&map.view(), 0.3, 64, 64).is_err());
    }

    #[test]
    fn test_model_not_found_error() {
        let result = TextDetector::new("/nonexistent/det_model.onnx");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
