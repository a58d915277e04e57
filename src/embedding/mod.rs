//! Embedding providers.
//!
//! The pipeline talks to an [`Embedder`] trait object so the real model can
//! be swapped for a deterministic double in tests. Both call sites — the
//! batched indexing path and the single-query path — go through the same
//! provider, so vectors are comparable wherever they were produced.

pub mod fastembed;

use async_trait::async_trait;

use crate::types::RetrievalError;

pub use self::fastembed::FastEmbedder;

/// Maps text to fixed-dimension L2-normalized vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, one vector per input, in input order.
    /// No partial results: any failure fails the whole batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    /// Embeds a single query string with the same model and normalization
    /// as the batch path.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let texts = [text.to_string()];
        let mut batch = self.embed_batch(&texts).await?;
        batch
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("embedder returned an empty batch".into()))
    }

    /// Vector width, constant for the lifetime of the provider.
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Deterministic token-hash embedder.
///
/// Each lowercased alphanumeric token hashes to a pseudo-random unit-range
/// vector; a text embeds as the L2-normalized sum of its token vectors, so
/// texts sharing tokens land measurably closer than unrelated ones. No
/// model download, no I/O — this is the test double and offline stand-in
/// for the real model.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            for (slot, value) in sum.iter_mut().zip(token_vector(token, self.dimensions)) {
                *slot += value;
            }
            tokens += 1;
        }
        if tokens == 0 {
            return sum;
        }

        let norm = sum.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut sum {
                *value /= norm;
            }
        }
        sum
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

fn token_vector(token: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    let mut state = hasher.finish().max(1);

    (0..dimensions)
        .map(|_| {
            // xorshift64* stream seeded by the token hash
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            let bits = state.wrapping_mul(0x2545_F491_4F6C_DD1D);
            ((bits >> 11) as f32 / (1u64 << 53) as f32) * 2.0 - 1.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let texts = vec!["peaceful cat".to_string(), "loud dog".to_string()];
        let first = embedder.embed_batch(&texts).await.unwrap();
        let second = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn dimension_is_constant_across_calls() {
        let embedder = HashEmbedder::new(48);
        for text in ["a", "some longer sentence with more tokens", ""] {
            let vec = embedder.embed_query(text).await.unwrap();
            assert_eq!(vec.len(), 48);
            assert_eq!(vec.len(), embedder.dimensions());
        }
    }

    #[tokio::test]
    async fn non_empty_text_embeds_to_unit_vector() {
        let embedder = HashEmbedder::new(96);
        let vec = embedder.embed_query("a peaceful cat naps").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn shared_tokens_pull_vectors_closer() {
        let embedder = HashEmbedder::new(128);
        let query = embedder.embed_query("peaceful cat").await.unwrap();
        let cat = embedder
            .embed_query("peaceful cat a calm companion")
            .await
            .unwrap();
        let dog = embedder
            .embed_query("loud dog barks at everything")
            .await
            .unwrap();

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&query, &cat) > dot(&query, &dog));
    }

    #[tokio::test]
    async fn query_and_batch_paths_agree() {
        let embedder = HashEmbedder::new(32);
        let via_query = embedder.embed_query("matching text").await.unwrap();
        let via_batch = embedder
            .embed_batch(&["matching text".to_string()])
            .await
            .unwrap();
        assert_eq!(via_query, via_batch[0]);
    }
}
