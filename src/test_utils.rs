use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::commons::image_payload::{ImageFormat, ImagePayload};
use crate::matching::fare_ledger::FareLedger;
use crate::matching::matcher::EuclideanMatcher;
use crate::repositories::memory_face_repository::InMemoryFaceRepository;
use crate::services::embedding_service::{EmbeddingError, EmbeddingExtractor, RepresentResponse};
use crate::services::face_service::FaceService;
use crate::services::metrics_service::MetricsService;

/// Maps exact image bytes to a fixed embedding; unknown images have no face.
#[derive(Default)]
pub struct StubExtractor {
    embeddings: HashMap<Vec<u8>, Vec<f64>>,
}

impl StubExtractor {
    pub fn with(mut self, image: &[u8], embedding: Vec<f64>) -> Self {
        self.embeddings.insert(image.to_vec(), embedding);
        self
    }
}

#[async_trait]
impl EmbeddingExtractor for StubExtractor {
    async fn embed(&self, image: &ImagePayload) -> Result<Vec<f64>, EmbeddingError> {
        self.embeddings
            .get(&image.bytes)
            .cloned()
            .ok_or(EmbeddingError::NoFaceDetected)
    }
}

pub struct UnavailableExtractor;

#[async_trait]
impl EmbeddingExtractor for UnavailableExtractor {
    async fn embed(&self, _image: &ImagePayload) -> Result<Vec<f64>, EmbeddingError> {
        Err(EmbeddingError::Upstream {
            status: 503,
            body: "model loading".to_string(),
        })
    }
}

/// Answers every image with a fixed `/represent` response body.
pub struct CannedRepresentExtractor(pub &'static str);

#[async_trait]
impl EmbeddingExtractor for CannedRepresentExtractor {
    async fn embed(&self, _image: &ImagePayload) -> Result<Vec<f64>, EmbeddingError> {
        let parsed: RepresentResponse =
            serde_json::from_str(self.0).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        parsed.into_embedding()
    }
}

pub fn jpeg(bytes: &[u8]) -> ImagePayload {
    ImagePayload {
        format: ImageFormat::Jpeg,
        bytes: bytes.to_vec(),
    }
}

pub fn test_metrics() -> MetricsService {
    MetricsService::new("127.0.0.1", 8125, "insight_be_test").expect("statsd client")
}

/// Face service over an empty in-memory store with a 10.0 threshold.
pub fn test_app_service(extractor: impl EmbeddingExtractor + 'static) -> FaceService {
    FaceService::new(
        Arc::new(InMemoryFaceRepository::new()),
        Arc::new(extractor),
        EuclideanMatcher::new(10.0),
        FareLedger::default(),
        test_metrics(),
    )
}
