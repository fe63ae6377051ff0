use actix_web::{http::StatusCode, HttpResponse};

use crate::commons::image_payload::ImagePayloadError;
use crate::matching::matcher::MatchError;
use crate::models::api_response::ApiResponse;
use crate::services::face_service::FaceServiceError;

/// Status, envelope code and cause for a failed face operation.
pub fn classify(error: &FaceServiceError) -> (StatusCode, &'static str, &'static str) {
    match error {
        FaceServiceError::Image(ImagePayloadError::UnsupportedMediaType(_)) => {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "2001", "UNSUPPORTED_MEDIA_TYPE")
        }
        FaceServiceError::Image(ImagePayloadError::Empty) => (StatusCode::BAD_REQUEST, "2002", "EMPTY_IMAGE"),
        FaceServiceError::Image(ImagePayloadError::InvalidEncoding(_)) => {
            (StatusCode::BAD_REQUEST, "2006", "INVALID_REQUEST_BODY")
        }
        FaceServiceError::NoFaceDetected => (StatusCode::UNPROCESSABLE_ENTITY, "2003", "NO_FACE_DETECTED"),
        FaceServiceError::Match(MatchError::EmptyQuery) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "2004", "EMPTY_EMBEDDING")
        }
        FaceServiceError::Match(MatchError::DimensionMismatch { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "1000", "SYSTEM_ERROR")
        }
        FaceServiceError::EmbeddingUnavailable(_) => (StatusCode::BAD_GATEWAY, "2007", "EMBEDDING_SERVICE_ERROR"),
        FaceServiceError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "2008", "STORE_UNAVAILABLE"),
    }
}

pub fn error_response(error: &FaceServiceError) -> HttpResponse {
    let (status, code, cause) = classify(error);
    HttpResponse::build(status).json(ApiResponse::failure(code, cause))
}

pub fn invalid_account_id() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::failure("2005", "INVALID_ACCOUNT_ID"))
}

/// Envelope for a body the extractor refused, e.g. one over the size limit.
pub fn rejected_body(error: actix_web::Error) -> HttpResponse {
    if error.as_response_error().status_code() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(error = %error, "request body over the size limit");
        return HttpResponse::PayloadTooLarge().json(ApiResponse::failure("2009", "PAYLOAD_TOO_LARGE"));
    }
    invalid_request_body(error)
}

pub fn invalid_request_body(detail: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::failure(
        "2006",
        format!("INVALID_REQUEST_BODY: {}", detail),
    ))
}
