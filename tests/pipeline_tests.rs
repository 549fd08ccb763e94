// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end pipeline tests with mocked detection and OCR

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use boxscan_node::config::{AppConfig, DetectionConfig, OcrConfig};
use boxscan_node::detection::{Detection, DetectionError, ObjectDetector};
use boxscan_node::pipeline::{Annotator, PipelineError, ScanPipeline};
use boxscan_node::vision::ocr::{CropRecognizer, OcrError, RecognitionOutcome};

struct StaticDetector {
    detections: Vec<Detection>,
}

#[async_trait]
impl ObjectDetector for StaticDetector {
    async fn detect(
        &self,
        _image: &[u8],
        _filename: &str,
    ) -> Result<Vec<Detection>, DetectionError> {
        Ok(self.detections.clone())
    }
}

struct FailingDetector;

#[async_trait]
impl ObjectDetector for FailingDetector {
    async fn detect(
        &self,
        _image: &[u8],
        _filename: &str,
    ) -> Result<Vec<Detection>, DetectionError> {
        Err(DetectionError::Http {
            status: 500,
            body: "upstream down".to_string(),
        })
    }
}

/// Hands out queued results, one per crop, in call order
struct QueueRecognizer {
    results: Mutex<VecDeque<Result<String, String>>>,
}

impl QueueRecognizer {
    fn new(results: Vec<Result<&str, &str>>) -> Self {
        Self {
            results: Mutex::new(
                results
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
        }
    }
}

impl CropRecognizer for QueueRecognizer {
    fn recognize(&self, _crop_path: &Path) -> Result<RecognitionOutcome, OcrError> {
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(text)) if text.is_empty() => Ok(RecognitionOutcome::Empty),
            Some(Ok(text)) => Ok(RecognitionOutcome::Found(text)),
            Some(Err(message)) => Err(OcrError::Primary(anyhow::anyhow!(message))),
            None => Ok(RecognitionOutcome::Empty),
        }
    }
}

fn detection(class: &str, x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection {
        class_label: class.to_string(),
        x,
        y,
        width: w,
        height: h,
        confidence: 0.9,
    }
}

struct TestEnv {
    config: Arc<AppConfig>,
    _tmp: tempfile::TempDir,
}

fn test_env() -> TestEnv {
    let tmp = tempfile::tempdir().unwrap();
    let config = AppConfig {
        upload_dir: tmp.path().join("uploads"),
        detection_dir: tmp.path().join("detections"),
        cropped_dir: tmp.path().join("cropped"),
        api_port: 0,
        detection: DetectionConfig {
            api_key: "k".to_string(),
            model_id: "m".to_string(),
            model_version: "1".to_string(),
            base_url: "https://detect.example.com".to_string(),
            confidence: 0.5,
            overlap: 0.5,
            timeout_secs: 5,
        },
        ocr: OcrConfig::from_env(),
    };
    config.ensure_directories().unwrap();
    TestEnv { config: Arc::new(config), _tmp: tmp }
}

fn write_upload(env: &TestEnv, name: &str) -> PathBuf {
    let path = env.config.upload_dir.join(name);
    let img = image::RgbImage::from_pixel(200, 200, image::Rgb([255, 255, 255]));
    img.save(&path).unwrap();
    path
}

fn pipeline(
    env: &TestEnv,
    detector: impl ObjectDetector + 'static,
    recognizer: QueueRecognizer,
) -> ScanPipeline {
    ScanPipeline::new(
        Arc::new(detector),
        Arc::new(recognizer),
        Annotator::with_font(None),
        env.config.clone(),
    )
}

#[tokio::test]
async fn zero_detections_still_succeed() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let pipeline = pipeline(
        &env,
        StaticDetector { detections: vec![] },
        QueueRecognizer::new(vec![]),
    );

    let outcome = pipeline.process(&upload).await.unwrap();

    assert_eq!(outcome.fields.units, "N/A");
    assert_eq!(outcome.fields.box_no, "N/A");
    assert!(outcome.cropped_images.is_empty());

    // The result image is written and untouched by annotation
    assert_eq!(
        outcome.annotated_image,
        env.config.detection_dir.join("result_box.png")
    );
    let result = image::open(&outcome.annotated_image).unwrap().to_rgb8();
    assert!(result.pixels().all(|p| *p == image::Rgb([255, 255, 255])));
}

#[tokio::test]
async fn detection_failure_aborts_before_artifacts() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let pipeline = pipeline(&env, FailingDetector, QueueRecognizer::new(vec![]));

    let err = pipeline.process(&upload).await.unwrap_err();
    assert!(matches!(err, PipelineError::Detection(DetectionError::Http { status: 500, .. })));

    // Nothing was persisted
    assert_eq!(std::fs::read_dir(&env.config.cropped_dir).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(&env.config.detection_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn crops_are_indexed_in_detection_order() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let detections = vec![
        detection("Units", 50.0, 50.0, 40.0, 20.0),
        detection("BoxNo", 150.0, 50.0, 40.0, 20.0),
        detection("Units", 100.0, 150.0, 40.0, 20.0),
    ];
    let pipeline = pipeline(
        &env,
        StaticDetector { detections },
        QueueRecognizer::new(vec![Ok("1"), Ok("2"), Ok("3")]),
    );

    let outcome = pipeline.process(&upload).await.unwrap();

    assert_eq!(outcome.cropped_images.len(), 3);
    for (i, path) in outcome.cropped_images.iter().enumerate() {
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("cropped_{}.png", i)
        );
        assert!(path.is_file());
    }
}

#[tokio::test]
async fn fields_extracted_from_known_classes() {
    let env = test_env();
    let upload = write_upload(&env, "label.png");
    let detections = vec![
        detection("Units", 50.0, 50.0, 40.0, 20.0),
        detection("BoxNo", 150.0, 50.0, 40.0, 20.0),
    ];
    let pipeline = pipeline(
        &env,
        StaticDetector { detections },
        QueueRecognizer::new(vec![Ok("12"), Ok("B-7")]),
    );

    let outcome = pipeline.process(&upload).await.unwrap();
    assert_eq!(outcome.fields.units, "12");
    assert_eq!(outcome.fields.box_no, "B-7");
    assert_eq!(
        outcome.annotated_image,
        env.config.detection_dir.join("result_label.png")
    );
}

#[tokio::test]
async fn same_class_texts_are_joined() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let detections = vec![
        detection("BoxNo", 50.0, 50.0, 40.0, 20.0),
        detection("BoxNo", 150.0, 50.0, 40.0, 20.0),
    ];
    let pipeline = pipeline(
        &env,
        StaticDetector { detections },
        QueueRecognizer::new(vec![Ok("4"), Ok("2")]),
    );

    let outcome = pipeline.process(&upload).await.unwrap();
    assert_eq!(outcome.fields.box_no, "4 2");
    assert_eq!(outcome.fields.units, "N/A");
}

#[tokio::test]
async fn unknown_classes_are_cropped_but_not_mapped() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let detections = vec![detection("Barcode", 100.0, 100.0, 60.0, 30.0)];
    let pipeline = pipeline(
        &env,
        StaticDetector { detections },
        QueueRecognizer::new(vec![Ok("XYZ123")]),
    );

    let outcome = pipeline.process(&upload).await.unwrap();
    assert_eq!(outcome.cropped_images.len(), 1);
    assert_eq!(outcome.fields.units, "N/A");
    assert_eq!(outcome.fields.box_no, "N/A");

    // The unknown class still gets its annotation outline
    let result = image::open(&outcome.annotated_image).unwrap().to_rgb8();
    assert!(result.pixels().any(|p| *p == image::Rgb([255, 0, 0])));
}

#[tokio::test]
async fn ocr_failure_degrades_to_empty_text() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let detections = vec![
        detection("Units", 50.0, 50.0, 40.0, 20.0),
        detection("Units", 150.0, 50.0, 40.0, 20.0),
    ];
    let pipeline = pipeline(
        &env,
        StaticDetector { detections },
        QueueRecognizer::new(vec![Err("engine crashed"), Ok("8")]),
    );

    // A per-crop OCR failure must not fail the scan
    let outcome = pipeline.process(&upload).await.unwrap();
    assert_eq!(outcome.cropped_images.len(), 2);
    // First crop contributed an empty piece; join is end-trimmed
    assert_eq!(outcome.fields.units, "8");
}

#[tokio::test]
async fn detection_larger_than_image_is_clamped() {
    let env = test_env();
    let upload = write_upload(&env, "box.png");
    let detections = vec![detection("Units", 100.0, 100.0, 500.0, 500.0)];
    let pipeline = pipeline(
        &env,
        StaticDetector { detections },
        QueueRecognizer::new(vec![Ok("ok")]),
    );

    let outcome = pipeline.process(&upload).await.unwrap();
    assert_eq!(outcome.cropped_images.len(), 1);
    let crop = image::open(&outcome.cropped_images[0]).unwrap();
    assert!(crop.width() <= 200 && crop.height() <= 200);
}
