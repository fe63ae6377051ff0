use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commons::image_payload::ImagePayload;
use crate::services::metrics_service::{tags, MetricsService};

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("no face detected in image")]
    NoFaceDetected,
    #[error("embedding service returned an empty embedding")]
    EmptyEmbedding,
    #[error("embedding service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Turns a face image into an embedding vector.
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    async fn embed(&self, image: &ImagePayload) -> Result<Vec<f64>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
pub struct RepresentRequest<'a> {
    pub img: String,
    pub model_name: &'a str,
    pub detector_backend: &'a str,
    pub enforce_detection: bool,
}

#[derive(Debug, Deserialize)]
pub struct RepresentResponse {
    #[serde(default)]
    pub results: Vec<RepresentResult>,
}

#[derive(Debug, Deserialize)]
pub struct RepresentResult {
    pub embedding: Vec<f64>,
}

impl RepresentResponse {
    /// Embedding of the first detected face.
    pub fn into_embedding(self) -> Result<Vec<f64>, EmbeddingError> {
        let first = self
            .results
            .into_iter()
            .next()
            .ok_or(EmbeddingError::NoFaceDetected)?;

        if first.embedding.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }

        Ok(first.embedding)
    }
}

/// DeepFace answers a missing face with a 400 and an explanatory message.
pub fn classify_upstream_error(status: u16, body: String) -> EmbeddingError {
    let lowered = body.to_ascii_lowercase();
    if (400..500).contains(&status) && lowered.contains("could not be detected") {
        EmbeddingError::NoFaceDetected
    } else {
        EmbeddingError::Upstream { status, body }
    }
}

/// Client of a DeepFace-compatible `/represent` endpoint.
#[derive(Clone)]
pub struct EmbeddingService {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
    detector_backend: String,
    metrics: MetricsService,
}

impl EmbeddingService {
    pub fn new(
        base_url: String,
        model_name: String,
        detector_backend: String,
        timeout_millis: u64,
        metrics: MetricsService,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_millis))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name,
            detector_backend,
            metrics,
        })
    }

    async fn request_embedding(&self, image: &ImagePayload) -> Result<Vec<f64>, EmbeddingError> {
        let url = format!("{}/represent", self.base_url);
        let body = RepresentRequest {
            img: image.to_data_uri(),
            model_name: &self.model_name,
            detector_backend: &self.detector_backend,
            enforce_detection: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_upstream_error(status.as_u16(), text));
        }

        let parsed: RepresentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        parsed.into_embedding()
    }
}

#[async_trait]
impl EmbeddingExtractor for EmbeddingService {
    async fn embed(&self, image: &ImagePayload) -> Result<Vec<f64>, EmbeddingError> {
        let start = std::time::Instant::now();
        let mut tags = tags(&[("model", self.model_name.as_str()), ("format", image.format.mime())]);

        let result = self.request_embedding(image).await;

        match &result {
            Ok(embedding) => {
                tracing::debug!(dimensions = embedding.len(), "embedding extracted");
                self.metrics.increment("embedding.success", Some(tags.clone()));
            }
            Err(EmbeddingError::NoFaceDetected) => {
                tags.insert("error".to_string(), "no_face".to_string());
                self.metrics.increment("embedding.failed", Some(tags.clone()));
            }
            Err(EmbeddingError::EmptyEmbedding) => {
                tracing::warn!("embedding service returned an empty vector");
                tags.insert("error".to_string(), "empty".to_string());
                self.metrics.increment("embedding.failed", Some(tags.clone()));
            }
            Err(e) => {
                tracing::error!(error = %e, "embedding service call failed");
                tags.insert("error".to_string(), "upstream".to_string());
                self.metrics.increment("embedding.failed", Some(tags.clone()));
            }
        }

        self.metrics.timing("embedding.duration", start.elapsed(), Some(tags));
        result
    }
}
