pub mod embedding_service;
pub mod face_service;
pub mod metrics_service;
