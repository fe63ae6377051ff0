use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::matching::fare_ledger::{FareDecision, FareLedger};
use crate::models::face::EnrolledEmbedding;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Persistent enrollment store.
#[async_trait]
pub trait FaceRepository: Send + Sync {
    /// Store one embedding for an account and return the new record id.
    async fn insert(&self, account_id: &str, embedding: &[f64]) -> Result<Uuid, RepositoryError>;

    /// Remove every embedding of an account, returning how many were deleted.
    async fn delete_by_account(&self, account_id: &str) -> Result<u64, RepositoryError>;

    async fn fetch_all(&self) -> Result<Vec<EnrolledEmbedding>, RepositoryError>;

    /// Apply the fare rule for an account atomically.
    ///
    /// The stored `last_transaction` is read, passed to `ledger`, and written
    /// back on a charge, all under one per-account lock. Returns `None` when
    /// the account has no enrolled embeddings.
    async fn charge_fare(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        ledger: &FareLedger,
    ) -> Result<Option<FareDecision>, RepositoryError>;

    async fn ping(&self) -> Result<(), RepositoryError>;

    fn name(&self) -> &'static str;
}
