use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::commons::image_payload::{ImagePayload, ImagePayloadError};
use crate::matching::fare_ledger::FareLedger;
use crate::matching::matcher::{euclidean_distance, EuclideanMatcher, MatchError};
use crate::models::face::{
    AddFaceResponse, FaceMatch, FareStatus, PayFareResponse, RemoveFaceResponse, VerifyFacesResponse,
};
use crate::repositories::face_repository::{FaceRepository, RepositoryError};
use crate::services::embedding_service::{EmbeddingError, EmbeddingExtractor};
use crate::services::metrics_service::{tags, MetricsService};

#[derive(Error, Debug)]
pub enum FaceServiceError {
    #[error(transparent)]
    Image(#[from] ImagePayloadError),
    #[error("no face detected in image")]
    NoFaceDetected,
    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl From<EmbeddingError> for FaceServiceError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::NoFaceDetected => FaceServiceError::NoFaceDetected,
            EmbeddingError::EmptyEmbedding => FaceServiceError::Match(MatchError::EmptyQuery),
            other => FaceServiceError::EmbeddingUnavailable(other.to_string()),
        }
    }
}

impl FaceServiceError {
    /// Short label used as a metrics tag.
    pub fn kind(&self) -> &'static str {
        match self {
            FaceServiceError::Image(ImagePayloadError::UnsupportedMediaType(_)) => "unsupported_media_type",
            FaceServiceError::Image(_) => "invalid_image",
            FaceServiceError::NoFaceDetected => "no_face",
            FaceServiceError::EmbeddingUnavailable(_) => "embedding_unavailable",
            FaceServiceError::Match(MatchError::EmptyQuery) => "empty_query",
            FaceServiceError::Match(MatchError::DimensionMismatch { .. }) => "dimension_mismatch",
            FaceServiceError::Store(_) => "store_unavailable",
        }
    }
}

/// Enrollment, identification and fare charging on top of an enrollment store.
#[derive(Clone)]
pub struct FaceService {
    repository: Arc<dyn FaceRepository>,
    extractor: Arc<dyn EmbeddingExtractor>,
    matcher: EuclideanMatcher,
    ledger: FareLedger,
    metrics: MetricsService,
}

impl FaceService {
    pub fn new(
        repository: Arc<dyn FaceRepository>,
        extractor: Arc<dyn EmbeddingExtractor>,
        matcher: EuclideanMatcher,
        ledger: FareLedger,
        metrics: MetricsService,
    ) -> Self {
        Self {
            repository,
            extractor,
            matcher,
            ledger,
            metrics,
        }
    }

    pub fn repository(&self) -> &Arc<dyn FaceRepository> {
        &self.repository
    }

    pub async fn add_face(
        &self,
        account_id: &str,
        image: &ImagePayload,
    ) -> Result<AddFaceResponse, FaceServiceError> {
        let start = Instant::now();
        let result: Result<AddFaceResponse, FaceServiceError> = async {
            let embedding = self.embed(image).await?;
            let face_id = self.repository.insert(account_id, &embedding).await?;
            Ok(AddFaceResponse {
                face_id,
                account_id: account_id.to_string(),
                dimensions: embedding.len(),
            })
        }
        .await;

        if let Ok(response) = &result {
            tracing::info!(account_id, face_id = %response.face_id, dimensions = response.dimensions, "face enrolled");
        }
        self.record("face.add", start, &result);
        result
    }

    pub async fn remove_face(&self, account_id: &str) -> Result<RemoveFaceResponse, FaceServiceError> {
        let start = Instant::now();
        let result = self
            .repository
            .delete_by_account(account_id)
            .await
            .map(|deleted_count| RemoveFaceResponse {
                account_id: account_id.to_string(),
                deleted_count,
            })
            .map_err(FaceServiceError::from);

        if let Ok(response) = &result {
            tracing::info!(account_id, deleted = response.deleted_count, "faces removed");
        }
        self.record("face.remove", start, &result);
        result
    }

    pub async fn search_face(&self, image: &ImagePayload) -> Result<Option<FaceMatch>, FaceServiceError> {
        let start = Instant::now();
        let result = self.identify(image).await;
        self.record("face.search", start, &result);
        result
    }

    pub async fn pay_fare(
        &self,
        image: &ImagePayload,
        now: DateTime<Utc>,
    ) -> Result<PayFareResponse, FaceServiceError> {
        let start = Instant::now();
        let result: Result<PayFareResponse, FaceServiceError> = async {
            let Some(found) = self.identify(image).await? else {
                return Ok(no_match());
            };

            let decision = self
                .repository
                .charge_fare(&found.account_id, now, &self.ledger)
                .await?;

            let response = match decision {
                // Embeddings removed between the search and the charge.
                None => no_match(),
                Some(decision) => PayFareResponse {
                    status: if decision.is_charged() {
                        FareStatus::Charged
                    } else {
                        FareStatus::Suppressed
                    },
                    account_id: Some(found.account_id),
                    diff_seconds: decision.seconds_since_last(),
                },
            };

            Ok(response)
        }
        .await;

        if let Ok(response) = &result {
            tracing::info!(
                status = %response.status,
                account_id = response.account_id.as_deref().unwrap_or_default(),
                diff_seconds = ?response.diff_seconds,
                "fare scan processed"
            );
            let status = response.status.to_string().to_ascii_lowercase();
            self.metrics
                .increment("fare.scan", Some(tags(&[("status", status.as_str())])));
        }
        self.record("fare.pay", start, &result);
        result
    }

    /// Compare two images directly, without touching the enrollment store.
    pub async fn verify_faces(
        &self,
        first: &ImagePayload,
        second: &ImagePayload,
    ) -> Result<VerifyFacesResponse, FaceServiceError> {
        let start = Instant::now();
        let result: Result<VerifyFacesResponse, FaceServiceError> = async {
            let a = self.embed(first).await?;
            let b = self.embed(second).await?;
            let distance = euclidean_distance(&a, &b)?;
            let threshold = self.matcher.threshold();
            Ok(VerifyFacesResponse {
                verified: distance <= threshold,
                distance,
                threshold,
            })
        }
        .await;

        self.record("face.verify", start, &result);
        result
    }

    async fn embed(&self, image: &ImagePayload) -> Result<Vec<f64>, FaceServiceError> {
        let embedding = self.extractor.embed(image).await?;
        if embedding.is_empty() {
            return Err(MatchError::EmptyQuery.into());
        }
        Ok(embedding)
    }

    async fn identify(&self, image: &ImagePayload) -> Result<Option<FaceMatch>, FaceServiceError> {
        let query = self.embed(image).await?;
        let enrolled = self.repository.fetch_all().await?;
        self.metrics
            .gauge("face.enrolled.records", enrolled.len() as f64, None);

        Ok(self.matcher.find_match(&query, &enrolled)?)
    }

    fn record<T>(&self, operation: &str, start: Instant, result: &Result<T, FaceServiceError>) {
        let mut tags = tags(&[("store", self.repository.name())]);
        match result {
            Ok(_) => self.metrics.increment(&format!("{}.success", operation), Some(tags.clone())),
            Err(e) => {
                tracing::warn!(operation, error = %e, "face operation failed");
                tags.insert("error".to_string(), e.kind().to_string());
                self.metrics.increment(&format!("{}.failed", operation), Some(tags.clone()));
            }
        }
        self.metrics
            .timing(&format!("{}.duration", operation), start.elapsed(), Some(tags));
    }
}

fn no_match() -> PayFareResponse {
    PayFareResponse {
        status: FareStatus::NoMatch,
        account_id: None,
        diff_seconds: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory_face_repository::InMemoryFaceRepository;
    use crate::test_utils::{jpeg, test_metrics, CannedRepresentExtractor, StubExtractor, UnavailableExtractor};
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn service(extractor: StubExtractor) -> (FaceService, Arc<InMemoryFaceRepository>) {
        let repository = Arc::new(InMemoryFaceRepository::new());
        let service = FaceService::new(
            repository.clone(),
            Arc::new(extractor),
            EuclideanMatcher::new(10.0),
            FareLedger::default(),
            test_metrics(),
        );
        (service, repository)
    }

    fn extractor() -> StubExtractor {
        StubExtractor::default()
            .with(b"alice", vec![0.0, 0.0, 0.0])
            .with(b"alice-again", vec![0.0, 0.0, 0.5])
            .with(b"stranger", vec![100.0, 100.0, 100.0])
            .with(b"blank", vec![])
    }

    #[actix_rt::test]
    async fn test_enroll_then_search() {
        let (service, _) = service(extractor());

        let added = service.add_face("42", &jpeg(b"alice")).await.unwrap();
        assert_eq!(added.account_id, "42");
        assert_eq!(added.dimensions, 3);

        let found = service.search_face(&jpeg(b"alice-again")).await.unwrap().unwrap();
        assert_eq!(found.account_id, "42");
        assert!((found.distance - 0.5).abs() < 1e-12);

        let none = service.search_face(&jpeg(b"stranger")).await.unwrap();
        assert!(none.is_none());
    }

    #[actix_rt::test]
    async fn test_search_empty_store() {
        let (service, _) = service(extractor());
        assert!(service.search_face(&jpeg(b"alice")).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_no_face_detected() {
        let (service, repository) = service(extractor());
        let err = service.add_face("42", &jpeg(b"landscape")).await.unwrap_err();
        assert!(matches!(err, FaceServiceError::NoFaceDetected));
        assert!(repository.fetch_all().await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_empty_embedding_rejected() {
        let (service, _) = service(extractor());
        let err = service.search_face(&jpeg(b"blank")).await.unwrap_err();
        assert!(matches!(err, FaceServiceError::Match(MatchError::EmptyQuery)));
    }

    #[actix_rt::test]
    async fn test_empty_represent_embedding_is_empty_query() {
        let repository = Arc::new(InMemoryFaceRepository::new());
        let service = FaceService::new(
            repository.clone(),
            Arc::new(CannedRepresentExtractor(r#"{"results":[{"embedding":[]}]}"#)),
            EuclideanMatcher::default(),
            FareLedger::default(),
            test_metrics(),
        );

        let err = service.add_face("42", &jpeg(b"alice")).await.unwrap_err();
        assert!(matches!(err, FaceServiceError::Match(MatchError::EmptyQuery)));
        assert_eq!(err.kind(), "empty_query");
        assert!(repository.fetch_all().await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_embedding_service_down() {
        let repository = Arc::new(InMemoryFaceRepository::new());
        let service = FaceService::new(
            repository,
            Arc::new(UnavailableExtractor),
            EuclideanMatcher::default(),
            FareLedger::default(),
            test_metrics(),
        );
        let err = service.search_face(&jpeg(b"alice")).await.unwrap_err();
        assert!(matches!(err, FaceServiceError::EmbeddingUnavailable(_)));
        assert_eq!(err.kind(), "embedding_unavailable");
    }

    #[actix_rt::test]
    async fn test_remove_face() {
        let (service, _) = service(extractor());
        service.add_face("42", &jpeg(b"alice")).await.unwrap();
        service.add_face("42", &jpeg(b"alice-again")).await.unwrap();

        let removed = service.remove_face("42").await.unwrap();
        assert_eq!(removed.deleted_count, 2);
        assert!(service.search_face(&jpeg(b"alice")).await.unwrap().is_none());

        let removed = service.remove_face("42").await.unwrap();
        assert_eq!(removed.deleted_count, 0);
    }

    #[actix_rt::test]
    async fn test_pay_fare_cooldown_sequence() {
        let (service, repository) = service(extractor());
        service.add_face("7", &jpeg(b"alice")).await.unwrap();

        let first = service.pay_fare(&jpeg(b"alice"), at(0)).await.unwrap();
        assert_eq!(first.status, FareStatus::Charged);
        assert_eq!(first.account_id.as_deref(), Some("7"));
        assert_eq!(first.diff_seconds, None);
        assert_eq!(repository.last_transaction("7").await, Some(at(0)));

        let second = service.pay_fare(&jpeg(b"alice-again"), at(7200)).await.unwrap();
        assert_eq!(second.status, FareStatus::Suppressed);
        assert_eq!(second.diff_seconds, Some(7200.0));
        assert_eq!(repository.last_transaction("7").await, Some(at(0)));

        let third = service.pay_fare(&jpeg(b"alice"), at(10_801)).await.unwrap();
        assert_eq!(third.status, FareStatus::Charged);
        assert_eq!(third.diff_seconds, Some(10_801.0));
        assert_eq!(repository.last_transaction("7").await, Some(at(10_801)));
    }

    #[actix_rt::test]
    async fn test_pay_fare_no_match() {
        let (service, _) = service(extractor());
        service.add_face("7", &jpeg(b"alice")).await.unwrap();

        let response = service.pay_fare(&jpeg(b"stranger"), at(0)).await.unwrap();
        assert_eq!(response.status, FareStatus::NoMatch);
        assert!(response.account_id.is_none());
    }

    #[actix_rt::test]
    async fn test_verify_faces() {
        let (service, _) = service(extractor());

        let same = service
            .verify_faces(&jpeg(b"alice"), &jpeg(b"alice-again"))
            .await
            .unwrap();
        assert!(same.verified);
        assert_eq!(same.threshold, 10.0);

        let different = service
            .verify_faces(&jpeg(b"alice"), &jpeg(b"stranger"))
            .await
            .unwrap();
        assert!(!different.verified);
        assert!(different.distance > 10.0);
    }

    #[actix_rt::test]
    async fn test_pay_fare_after_cooldown_uses_latest_charge() {
        let (service, _) = service(extractor());
        service.add_face("7", &jpeg(b"alice")).await.unwrap();

        service.pay_fare(&jpeg(b"alice"), at(0)).await.unwrap();
        service.pay_fare(&jpeg(b"alice"), at(10_800)).await.unwrap();

        let response = service
            .pay_fare(&jpeg(b"alice"), at(10_800) + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(response.status, FareStatus::Suppressed);
        assert_eq!(response.diff_seconds, Some(3600.0));
    }
}
