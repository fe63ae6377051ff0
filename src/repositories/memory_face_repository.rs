use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::matching::fare_ledger::{FareDecision, FareLedger};
use crate::models::face::EnrolledEmbedding;
use crate::repositories::face_repository::{FaceRepository, RepositoryError};

#[derive(Debug, Clone)]
struct StoredFace {
    id: Uuid,
    account_id: String,
    embedding: Vec<f64>,
    last_transaction: Option<DateTime<Utc>>,
}

/// Process-local enrollment store, selected with `FACE_STORE=memory`.
///
/// One lock guards every record, so fare decisions are serialised.
#[derive(Default)]
pub struct InMemoryFaceRepository {
    faces: Mutex<Vec<StoredFace>>,
}

impl InMemoryFaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn last_transaction(&self, account_id: &str) -> Option<DateTime<Utc>> {
        let faces = self.faces.lock().await;
        faces
            .iter()
            .filter(|f| f.account_id == account_id)
            .filter_map(|f| f.last_transaction)
            .max()
    }
}

#[async_trait]
impl FaceRepository for InMemoryFaceRepository {
    async fn insert(&self, account_id: &str, embedding: &[f64]) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        self.faces.lock().await.push(StoredFace {
            id,
            account_id: account_id.to_string(),
            embedding: embedding.to_vec(),
            last_transaction: None,
        });
        Ok(id)
    }

    async fn delete_by_account(&self, account_id: &str) -> Result<u64, RepositoryError> {
        let mut faces = self.faces.lock().await;
        let before = faces.len();
        faces.retain(|f| f.account_id != account_id);
        Ok((before - faces.len()) as u64)
    }

    async fn fetch_all(&self) -> Result<Vec<EnrolledEmbedding>, RepositoryError> {
        let faces = self.faces.lock().await;
        Ok(faces
            .iter()
            .map(|f| EnrolledEmbedding {
                account_id: f.account_id.clone(),
                embedding: f.embedding.clone(),
            })
            .collect())
    }

    async fn charge_fare(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        ledger: &FareLedger,
    ) -> Result<Option<FareDecision>, RepositoryError> {
        let mut faces = self.faces.lock().await;

        let mut owned = faces.iter_mut().filter(|f| f.account_id == account_id).peekable();
        if owned.peek().is_none() {
            return Ok(None);
        }

        let mut rows: Vec<&mut StoredFace> = owned.collect();
        let last_transaction = rows.iter().filter_map(|f| f.last_transaction).max();
        let decision = ledger.decide(last_transaction, now);

        if let FareDecision::Charged { at, .. } = &decision {
            for face in rows.iter_mut() {
                face.last_transaction = Some(*at);
            }
        }

        tracing::trace!(
            account_id,
            ids = ?rows.iter().map(|f| f.id).collect::<Vec<_>>(),
            charged = decision.is_charged(),
            "memory store: fare applied"
        );

        Ok(Some(decision))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
