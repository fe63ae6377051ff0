pub mod errors;
pub mod faces;
pub mod fares;
pub mod health;
