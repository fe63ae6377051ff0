use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::matching::fare_ledger::DEFAULT_FARE_COOLDOWN_SECS;
use crate::matching::matcher::DEFAULT_MATCH_THRESHOLD;

const MAX_FARE_COOLDOWN_SECS: i64 = 366 * 24 * 3600;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub face_store: StoreKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub embedding_host: String,
    pub embedding_model: String,
    pub embedding_detector: String,
    pub embedding_timeout_millis: u64,
    /// Largest Euclidean distance still accepted as the same face.
    pub match_threshold: f64,
    pub fare_cooldown_secs: i64,
    pub statsd_host: String,
    pub statsd_port: u16,
    pub statsd_prefix: String,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let face_store = parsed(&lookup, "FACE_STORE", StoreKind::Postgres)?;
        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
        if face_store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let match_threshold: f64 = parsed(&lookup, "FACE_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD)?;
        if !match_threshold.is_finite() || match_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                key: "FACE_MATCH_THRESHOLD",
                value: match_threshold.to_string(),
            });
        }

        let fare_cooldown_secs: i64 = parsed(&lookup, "FARE_COOLDOWN_SECS", DEFAULT_FARE_COOLDOWN_SECS)?;
        if !(0..=MAX_FARE_COOLDOWN_SECS).contains(&fare_cooldown_secs) {
            return Err(ConfigError::Invalid {
                key: "FARE_COOLDOWN_SECS",
                value: fare_cooldown_secs.to_string(),
            });
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "PORT", 8080)?,
            face_store,
            database_url,
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            embedding_host: lookup("EMBEDDING_HOST").ok_or(ConfigError::Missing("EMBEDDING_HOST"))?,
            embedding_model: lookup("EMBEDDING_MODEL").unwrap_or_else(|| "Facenet".to_string()),
            embedding_detector: lookup("EMBEDDING_DETECTOR").unwrap_or_else(|| "mtcnn".to_string()),
            embedding_timeout_millis: parsed(&lookup, "EMBEDDING_TIMEOUT_MILLIS", 10_000)?,
            match_threshold,
            fare_cooldown_secs,
            statsd_host: lookup("STATSD_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            statsd_port: parsed(&lookup, "STATSD_PORT", 8125)?,
            statsd_prefix: lookup("STATSD_PREFIX").unwrap_or_else(|| "insight_be".to_string()),
            max_image_bytes: parsed(&lookup, "MAX_IMAGE_BYTES", 10 * 1024 * 1024)?,
        })
    }

    /// JSON bodies carry base64 images, which inflate them by a third.
    pub fn json_body_limit(&self) -> usize {
        self.max_image_bytes.saturating_mul(2)
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
