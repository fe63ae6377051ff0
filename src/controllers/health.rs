use actix_web::{web, HttpResponse};

use crate::{
    models::{api_response::ApiResponse, face::HealthResponse},
    services::face_service::FaceService,
};

#[actix_web::get("/health")]
pub async fn health(face_service: web::Data<FaceService>) -> HttpResponse {
    let repository = face_service.repository();

    match repository.ping().await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::ok(HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: repository.name().to_string(),
        })),
        Err(e) => {
            tracing::error!(error = %e, store = repository.name(), "health check failed");
            HttpResponse::ServiceUnavailable().json(ApiResponse::failure("2008", "STORE_UNAVAILABLE"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_app_service, StubExtractor};
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_rt::test]
    async fn test_health_reports_store() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_app_service(StubExtractor::default())))
                .service(health),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["store"], "memory");
    }
}
