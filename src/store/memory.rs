//! In-memory vector store.
//!
//! Brute-force cosine distance over a `RwLock`-guarded row list. Not meant
//! for large corpora; it exists so tests and development runs don't need a
//! sqlite file on disk.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{EntryRecord, RawMatch, VectorStore};
use crate::types::RetrievalError;

#[derive(Default)]
pub struct MemoryVectorStore {
    rows: RwLock<Vec<EntryRecord>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cosine distance matching the sqlite backend's `vec_distance_cosine`
    /// (0 = identical direction, 2 = opposite).
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 2.0;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 2.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn reset(&self) -> Result<(), RetrievalError> {
        self.rows.write().await.clear();
        Ok(())
    }

    async fn insert(&self, entries: Vec<EntryRecord>) -> Result<(), RetrievalError> {
        let mut rows = self.rows.write().await;
        for entry in entries {
            if entry.embedding.is_none() {
                continue;
            }
            if rows.iter().any(|existing| existing.id == entry.id) {
                return Err(RetrievalError::Index(format!(
                    "duplicate entry id '{}'",
                    entry.id
                )));
            }
            rows.push(entry);
        }
        debug!(total = rows.len(), "entries held in memory store");
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RawMatch>, RetrievalError> {
        let rows = self.rows.read().await;
        let mut matches: Vec<RawMatch> = rows
            .iter()
            .filter_map(|entry| {
                let stored = entry.embedding.as_ref()?;
                let distance = Self::cosine_distance(embedding, stored);
                let mut entry = entry.clone();
                entry.embedding = None;
                Some((entry, distance))
            })
            .collect();

        // Stable sort keeps insertion order for equal distances, matching
        // the sqlite backend's rowid tie-break.
        matches.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.rows.read().await.len())
    }
}
