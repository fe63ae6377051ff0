use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ConfigError, StoreKind};
use crate::matching::{fare_ledger::FareLedger, matcher::EuclideanMatcher};
use crate::repositories::{
    face_repository::FaceRepository, memory_face_repository::InMemoryFaceRepository,
    pg_face_repository::PgFaceRepository,
};
use crate::services::{
    embedding_service::EmbeddingService, face_service::FaceService, metrics_service::MetricsService,
};

mod commons;
mod config;
mod controllers;
mod matching;
mod models;
mod repositories;
mod services;
#[cfg(test)]
mod test_utils;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing with JSON format
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env()?;

    let metrics = MetricsService::new(&config.statsd_host, config.statsd_port, &config.statsd_prefix)?;

    let repository: Arc<dyn FaceRepository> = match config.face_store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            let repository = PgFaceRepository::new(pool);
            repository.migrate().await?;
            Arc::new(repository)
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory face store, enrollments are lost on restart");
            Arc::new(InMemoryFaceRepository::new())
        }
    };

    let extractor = EmbeddingService::new(
        config.embedding_host.clone(),
        config.embedding_model.clone(),
        config.embedding_detector.clone(),
        config.embedding_timeout_millis,
        metrics.clone(),
    )?;

    let face_service = web::Data::new(FaceService::new(
        repository,
        Arc::new(extractor),
        EuclideanMatcher::new(config.match_threshold),
        FareLedger::new(chrono::Duration::seconds(config.fare_cooldown_secs)),
        metrics,
    ));

    tracing::info!(
        host = %config.host,
        port = config.port,
        store = ?config.face_store,
        embedding_host = %config.embedding_host,
        threshold = config.match_threshold,
        cooldown_secs = config.fare_cooldown_secs,
        "insight_be starting"
    );

    let max_image_bytes = config.max_image_bytes;
    let json_body_limit = config.json_body_limit();

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::PayloadConfig::new(max_image_bytes))
            .app_data(web::JsonConfig::default().limit(json_body_limit))
            .app_data(face_service.clone())
            .service(controllers::health::health)
            .service(
                web::scope("/v1")
                    .service(controllers::faces::search_face)
                    .service(controllers::faces::verify_faces)
                    .service(controllers::faces::add_face)
                    .service(controllers::faces::remove_face)
                    .service(controllers::fares::pay_fare),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    tracing::info!("insight_be shutting down");

    Ok(())
}
