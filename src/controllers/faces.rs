use actix_web::{http::header, web, HttpRequest, HttpResponse};
use tracing::{info_span, Instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commons::image_payload::ImagePayload,
    controllers::errors::{error_response, invalid_account_id, invalid_request_body, rejected_body},
    models::{
        api_response::ApiResponse,
        face::{AccountPath, SearchFaceResponse, VerifyFacesRequest},
    },
    services::face_service::{FaceService, FaceServiceError},
};

/// Read the uploaded image from the raw body and its `Content-Type`.
pub fn image_from_request(req: &HttpRequest, body: web::Bytes) -> Result<ImagePayload, FaceServiceError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    Ok(ImagePayload::from_upload(content_type, body.to_vec())?)
}

#[actix_web::post("/faces/search")]
pub async fn search_face(
    req: HttpRequest,
    body: Result<web::Bytes, actix_web::Error>,
    face_service: web::Data<FaceService>,
) -> HttpResponse {
    let span = info_span!("search-face-api", correlation_id = %Uuid::new_v4());
    async move {
        let body = match body {
            Ok(body) => body,
            Err(e) => return rejected_body(e),
        };
        let image = match image_from_request(&req, body) {
            Ok(image) => image,
            Err(e) => return error_response(&e),
        };

        match face_service.search_face(&image).await {
            Ok(found) => HttpResponse::Ok().json(ApiResponse::ok(SearchFaceResponse::from(found))),
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}

#[actix_web::post("/faces/verify")]
pub async fn verify_faces(
    face_service: web::Data<FaceService>,
    body: Result<web::Json<VerifyFacesRequest>, actix_web::Error>,
) -> HttpResponse {
    let span = info_span!("verify-faces-api", correlation_id = %Uuid::new_v4());
    async move {
        let body = match body {
            Ok(b) => b.into_inner(),
            Err(e) => return rejected_body(e),
        };

        if let Err(e) = body.validate() {
            return invalid_request_body(e);
        }

        let (first, second) = match (
            ImagePayload::from_data_uri(&body.image1),
            ImagePayload::from_data_uri(&body.image2),
        ) {
            (Ok(first), Ok(second)) => (first, second),
            (Err(e), _) | (_, Err(e)) => return error_response(&FaceServiceError::from(e)),
        };

        match face_service.verify_faces(&first, &second).await {
            Ok(response) => HttpResponse::Ok().json(ApiResponse::ok(response)),
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}

#[actix_web::post("/accounts/{account_id}/faces")]
pub async fn add_face(
    req: HttpRequest,
    path: web::Path<AccountPath>,
    body: Result<web::Bytes, actix_web::Error>,
    face_service: web::Data<FaceService>,
) -> HttpResponse {
    let path = path.into_inner();
    let span = info_span!("add-face-api", correlation_id = %Uuid::new_v4(), account_id = %path.account_id);
    async move {
        if path.validate().is_err() {
            return invalid_account_id();
        }

        let body = match body {
            Ok(body) => body,
            Err(e) => return rejected_body(e),
        };
        let image = match image_from_request(&req, body) {
            Ok(image) => image,
            Err(e) => return error_response(&e),
        };

        match face_service.add_face(&path.account_id, &image).await {
            Ok(response) => HttpResponse::Created().json(ApiResponse::ok(response)),
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}

#[actix_web::delete("/accounts/{account_id}/faces")]
pub async fn remove_face(
    path: web::Path<AccountPath>,
    face_service: web::Data<FaceService>,
) -> HttpResponse {
    let path = path.into_inner();
    let span = info_span!("remove-face-api", correlation_id = %Uuid::new_v4(), account_id = %path.account_id);
    async move {
        if path.validate().is_err() {
            return invalid_account_id();
        }

        match face_service.remove_face(&path.account_id).await {
            Ok(response) => HttpResponse::Ok().json(ApiResponse::ok(response)),
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}
