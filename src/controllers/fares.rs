use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::{
    controllers::{
        errors::{error_response, rejected_body},
        faces::image_from_request,
    },
    models::api_response::ApiResponse,
    services::face_service::FaceService,
};

#[actix_web::post("/fares")]
pub async fn pay_fare(
    req: HttpRequest,
    body: Result<web::Bytes, actix_web::Error>,
    face_service: web::Data<FaceService>,
) -> HttpResponse {
    let span = info_span!("pay-fare-api", correlation_id = %Uuid::new_v4());
    async move {
        let body = match body {
            Ok(body) => body,
            Err(e) => return rejected_body(e),
        };
        let image = match image_from_request(&req, body) {
            Ok(image) => image,
            Err(e) => return error_response(&e),
        };

        match face_service.pay_fare(&image, Utc::now()).await {
            Ok(response) => HttpResponse::Ok().json(ApiResponse::ok(response)),
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}
