use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::matching::fare_ledger::{FareDecision, FareLedger};
use crate::models::face::EnrolledEmbedding;
use crate::repositories::face_repository::{FaceRepository, RepositoryError};

pub struct PgFaceRepository {
    pool: PgPool,
}

impl PgFaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl FaceRepository for PgFaceRepository {
    async fn insert(&self, account_id: &str, embedding: &[f64]) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO face_enrollments (id, account_id, embedding)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(account_id)
        .bind(embedding.to_vec())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn delete_by_account(&self, account_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM face_enrollments
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_all(&self) -> Result<Vec<EnrolledEmbedding>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, Vec<f64>)>(
            r#"
            SELECT account_id, embedding
            FROM face_enrollments
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(account_id, embedding)| EnrolledEmbedding {
                account_id,
                embedding,
            })
            .collect())
    }

    async fn charge_fare(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        ledger: &FareLedger,
    ) -> Result<Option<FareDecision>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row locks serialise concurrent scans of the same account until commit.
        let stamps = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT last_transaction
            FROM face_enrollments
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await?;

        if stamps.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        let last_transaction = stamps.into_iter().flatten().max();
        let decision = ledger.decide(last_transaction, now);

        if let FareDecision::Charged { at, .. } = &decision {
            sqlx::query(
                r#"
                UPDATE face_enrollments
                SET last_transaction = $2
                WHERE account_id = $1
                "#,
            )
            .bind(account_id)
            .bind(*at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(decision))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
