pub mod image_payload;
