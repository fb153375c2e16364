// survey-orchestrator-rs/tests/survey_pipeline_tests.rs
// End-to-end runs against mocked imagery, detector and assessment services

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use survey_orchestrator::dataset::ERROR_SENTINEL;
use survey_orchestrator::{
    preview_grid, AssessmentClassifier, AssessmentResult, CancelSignal, ClassifyError, CollectionOrchestrator,
    CollectionUrgency, DetectorLabelAdapter, GeminiAssessmentAdapter, GridSpec, HeadingSource, LabelClassifier,
    SampleCoordinate, ServiceArea, SurveyConfig, SurveyError, TrashIntensity, YesNo,
};
use vision_sdk::{DetectorClient, DetectorConfig, GeminiClient, GeminiConfig, StreetViewClient, StreetViewConfig};

fn jpeg_tile(shade: u8) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([shade, shade, shade])))
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

fn survey_config(root: &Path, workers: usize) -> SurveyConfig {
    SurveyConfig {
        workers,
        output_root: root.to_path_buf(),
        ..SurveyConfig::default()
    }
}

fn medellin() -> SampleCoordinate {
    SampleCoordinate::new(6.2442, -75.5812)
}

struct MockServices {
    imagery: MockServer,
    detector: MockServer,
    gemini: MockServer,
}

impl MockServices {
    async fn start() -> Self {
        Self {
            imagery: MockServer::start().await,
            detector: MockServer::start().await,
            gemini: MockServer::start().await,
        }
    }

    fn orchestrator(&self, config: SurveyConfig) -> CollectionOrchestrator {
        let street_view = StreetViewClient::new(StreetViewConfig {
            api_key: "street_key".to_string(),
            base_url: format!("{}/streetview", self.imagery.uri()),
            timeout_seconds: 5,
            ..StreetViewConfig::default()
        })
        .unwrap();
        let detector = DetectorClient::new(DetectorConfig {
            base_url: self.detector.uri(),
            api_key: None,
            timeout_seconds: 5,
        })
        .unwrap();
        let gemini = GeminiClient::new(GeminiConfig {
            api_key: "gemini_key".to_string(),
            base_url: self.gemini.uri(),
            model: "gemini-test".to_string(),
            timeout_seconds: 5,
        })
        .unwrap();

        let assessor = GeminiAssessmentAdapter::new(gemini, &config.response_language);
        CollectionOrchestrator::new(
            config,
            Arc::new(street_view),
            Arc::new(DetectorLabelAdapter::new(detector)),
            Arc::new(assessor),
        )
    }

    async fn mount_happy_path(&self) {
        Mock::given(method("GET"))
            .and(path("/streetview"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(jpeg_tile(120)),
            )
            .mount(&self.imagery)
            .await;

        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [
                    { "label": "clean", "confidence": 0.2 },
                    { "label": "litter", "confidence": 0.7 }
                ]
            })))
            .mount(&self.detector)
            .await;

        let reply = json!({
            "is_valid_image": true,
            "cleanliness_score": 5,
            "trash_accumulation": "Yes",
            "trash_intensity": "Light",
            "collection_urgency": "Moderately urgent",
            "bins_present": "Yes",
            "justification": "Algunas bolsas junto al poste."
        });
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(query_param("key", "gemini_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": format!("```json\n{}\n```", reply) }]
                    },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&self.gemini)
            .await;
    }
}

#[tokio::test]
async fn test_run_against_mocked_services() {
    let root = tempfile::tempdir().unwrap();
    let services = MockServices::start().await;

    let spec = GridSpec::new(medellin(), 300.0, 100.0);
    let coordinates = preview_grid(&spec).unwrap();
    let broken = coordinates[4];

    // Registered first so it wins over the catch-all imagery mock
    Mock::given(method("GET"))
        .and(path("/streetview"))
        .and(query_param("location", broken.key()))
        .and(query_param("heading", "180"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&services.imagery)
        .await;
    services.mount_happy_path().await;

    let outcome = services
        .orchestrator(survey_config(root.path(), 3))
        .run(spec, CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(outcome.dataset.len(), 9);
    let keys: HashSet<String> = outcome.dataset.iter().map(|r| r.coordinate.key()).collect();
    assert_eq!(keys.len(), 9);

    let failed: Vec<_> = outcome.dataset.iter().filter(|r| !r.is_captured()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].coordinate, broken);

    for record in outcome.dataset.iter().filter(|r| r.is_captured()) {
        let image_path = record.image_path().unwrap();
        assert!(image_path.starts_with(outcome.context.results_dir()));
        assert!(image_path.is_file());
        assert_eq!(record.label(), Some("litter"));

        let assessment = record.assessment().unwrap();
        assert_eq!(assessment.cleanliness_score, Some(5));
        assert_eq!(assessment.trash_intensity, Some(TrashIntensity::Light));
        // 10 + 1 + 2 + 0 + 2
        assert_eq!(record.priority_index(), Some(15.0));
    }

    let panorama = image::open(outcome.dataset.iter().find_map(|r| r.image_path()).unwrap()).unwrap();
    assert_eq!((panorama.width(), panorama.height()), (128, 16));

    let mut reader = csv::Reader::from_path(&outcome.dataset_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 9);
    let error_rows: Vec<_> = rows.iter().filter(|row| &row[2] == ERROR_SENTINEL).collect();
    assert_eq!(error_rows.len(), 1);
    assert_eq!(&error_rows[0][3], ERROR_SENTINEL);

    assert_eq!(outcome.summary.fetch_failures, 1);
    assert_eq!(outcome.summary.mean_priority_index, Some(15.0));
}

fn gemini_text(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}

#[tokio::test]
async fn test_unparseable_assessments_keep_their_rows() {
    let root = tempfile::tempdir().unwrap();
    let services = MockServices::start().await;

    // Registered first, so the first three assessment calls get these replies
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(gemini_text("La calle se ve bastante limpia, sin basura visible."))
        .up_to_n_times(2)
        .mount(&services.gemini)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(gemini_text("```json\n{\"is_valid_image\": true, \"cleanliness_score\": \n```"))
        .up_to_n_times(1)
        .mount(&services.gemini)
        .await;
    services.mount_happy_path().await;

    let outcome = services
        .orchestrator(survey_config(root.path(), 2))
        .run(GridSpec::new(medellin(), 300.0, 100.0), CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(outcome.dataset.len(), 9);
    assert!(outcome.dataset.iter().all(|r| r.is_captured()));
    assert!(outcome.dataset.iter().all(|r| r.label() == Some("litter")));

    let unassessed: Vec<_> = outcome.dataset.iter().filter(|r| r.assessment().is_none()).collect();
    assert_eq!(unassessed.len(), 3);
    for record in &unassessed {
        assert!(record.image_path().unwrap().is_file());
        assert_eq!(record.priority_index(), None);
    }

    let mut reader = csv::Reader::from_path(&outcome.dataset_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 9);
    assert!(rows.iter().all(|row| &row[2] != ERROR_SENTINEL && &row[3] == "litter"));

    let empty_rows: Vec<_> = rows.iter().filter(|row| row[4].is_empty()).collect();
    assert_eq!(empty_rows.len(), 3);
    for row in empty_rows {
        assert!((4..=11).all(|column| row[column].is_empty()));
    }

    assert_eq!(outcome.summary.total, 9);
    assert_eq!(outcome.summary.fetch_failures, 0);
    assert_eq!(outcome.summary.assessed, 6);
    assert_eq!(outcome.summary.mean_priority_index, Some(15.0));
}

#[tokio::test]
async fn test_rejected_input_makes_no_requests() {
    let root = tempfile::tempdir().unwrap();
    let services = MockServices::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_tile(10)))
        .expect(0)
        .mount(&services.imagery)
        .await;

    let too_small = GridSpec::new(medellin(), 50.0, 10.0);
    let err = services
        .orchestrator(survey_config(root.path(), 2))
        .run(too_small, CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, SurveyError::InvalidParameters(_)));

    let mut config = survey_config(root.path(), 2);
    config.service_area = Some(ServiceArea {
        center: SampleCoordinate::new(4.7110, -74.0721),
        radius_km: 20.0,
    });
    let err = services
        .orchestrator(config)
        .run(GridSpec::new(medellin(), 200.0, 100.0), CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, SurveyError::OutsideServiceArea { .. }));

    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

/// Imagery that fails every heading of a preselected set of points
struct FlakySource {
    tile: Bytes,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl HeadingSource for FlakySource {
    async fn fetch(&self, coordinate: SampleCoordinate, _heading: u16) -> vision_sdk::Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&coordinate.key()) {
            return Err(vision_sdk::ServiceError::timeout("simulated timeout"));
        }
        Ok(self.tile.clone())
    }
}

struct StaticLabel;

#[async_trait]
impl LabelClassifier for StaticLabel {
    async fn label(&self, _jpeg: &Bytes) -> Result<String, ClassifyError> {
        Ok("street".to_string())
    }
}

struct StaticAssessment;

#[async_trait]
impl AssessmentClassifier for StaticAssessment {
    async fn assess(&self, _jpeg: &Bytes) -> Result<AssessmentResult, ClassifyError> {
        Ok(AssessmentResult {
            is_valid_image: true,
            cleanliness_score: Some(9),
            trash_accumulation: Some(YesNo::No),
            trash_intensity: Some(TrashIntensity::None),
            collection_urgency: Some(CollectionUrgency::NotUrgent),
            bins_present: Some(YesNo::Yes),
            justification: "Limpia".to_string(),
        })
    }
}

#[tokio::test]
async fn test_random_failures_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let spec = GridSpec::new(medellin(), 1000.0, 50.0);
    let coordinates = preview_grid(&spec).unwrap();
    assert_eq!(coordinates.len(), 400);

    let mut rng = StdRng::seed_from_u64(7);
    let failing: HashSet<String> = coordinates
        .iter()
        .filter(|_| rng.gen_bool(0.1))
        .map(|c| c.key())
        .collect();

    let source = Arc::new(FlakySource {
        tile: Bytes::from(jpeg_tile(200)),
        failing: failing.clone(),
        calls: AtomicUsize::new(0),
    });
    let orchestrator = CollectionOrchestrator::new(
        survey_config(root.path(), 8),
        source.clone(),
        Arc::new(StaticLabel),
        Arc::new(StaticAssessment),
    );

    let outcome = orchestrator.run(spec, CancelSignal::never()).await.unwrap();

    assert_eq!(outcome.dataset.len(), 400);
    assert_eq!(outcome.summary.fetch_failures, failing.len());
    assert!((20..=60).contains(&outcome.summary.fetch_failures));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1600);

    for record in outcome.dataset.iter() {
        let expected_failure = failing.contains(&record.coordinate.key());
        assert_eq!(record.is_captured(), !expected_failure);
    }

    let written = std::fs::read_dir(outcome.context.results_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().map(|e| e == "jpg").unwrap_or(false))
        .count();
    assert_eq!(written, 400 - failing.len());
}
