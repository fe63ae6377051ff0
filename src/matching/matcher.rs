use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use crate::models::face::{EnrolledEmbedding, FaceMatch};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 10.0;

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("query embedding is empty")]
    EmptyQuery,
    #[error("embedding dimension mismatch: query has {query}, enrolled has {enrolled}")]
    DimensionMismatch { query: usize, enrolled: usize },
}

/// Euclidean distance between two embeddings of equal length.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            query: a.len(),
            enrolled: b.len(),
        });
    }

    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// Nearest-neighbour search over enrolled embeddings.
///
/// Every record is compared against the query. Records with a different
/// dimensionality are skipped. An account with several enrolled embeddings
/// is scored by its closest one. Only accounts within `threshold` survive,
/// and the closest of those is returned.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    threshold: f64,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl EuclideanMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn find_match(
        &self,
        query: &[f64],
        enrolled: &[EnrolledEmbedding],
    ) -> Result<Option<FaceMatch>, MatchError> {
        Ok(self.candidates(query, enrolled)?.into_iter().next())
    }

    /// All accounts within threshold, closest first.
    pub fn candidates(
        &self,
        query: &[f64],
        enrolled: &[EnrolledEmbedding],
    ) -> Result<Vec<FaceMatch>, MatchError> {
        if query.is_empty() {
            return Err(MatchError::EmptyQuery);
        }

        let mut best_per_account: HashMap<&str, f64> = HashMap::new();
        let mut skipped = 0usize;

        for record in enrolled {
            let distance = match euclidean_distance(query, &record.embedding) {
                Ok(distance) => distance,
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(account_id = %record.account_id, error = %e, "skipping enrolled embedding");
                    continue;
                }
            };

            if distance > self.threshold {
                continue;
            }

            best_per_account
                .entry(record.account_id.as_str())
                .and_modify(|best| {
                    if distance < *best {
                        *best = distance;
                    }
                })
                .or_insert(distance);
        }

        let mut candidates: Vec<FaceMatch> = best_per_account
            .into_iter()
            .map(|(account_id, distance)| FaceMatch {
                account_id: account_id.to_string(),
                distance,
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });

        tracing::debug!(
            enrolled = enrolled.len(),
            skipped,
            candidates = candidates.len(),
            threshold = self.threshold,
            "matcher: search complete"
        );

        Ok(candidates)
    }
}
