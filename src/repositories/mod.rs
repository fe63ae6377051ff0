pub mod face_repository;
pub mod memory_face_repository;
pub mod pg_face_repository;
