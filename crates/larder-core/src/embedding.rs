//! Embedding vectors and the embedding provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A point in the embedding model's semantic space.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.clone()
    }

    /// Cosine similarity in `[-1, 1]`; 0.0 when dimensions differ or either vector is zero.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f32 {
        let (a, b) = (self.as_slice(), other.as_slice());
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Trait for embedding model providers (Azure OpenAI, self-hosted, ...)
///
/// Implementations make exactly one provider call per `embed`; retry policy
/// is layered on top by the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Turn text into a vector. Fails with `EmbeddingUnavailable` when the
    /// provider cannot be reached or answers with a retryable error, with
    /// `EmbeddingRejected` when it refuses the request itself, and with
    /// `EmbeddingMalformed` when the response holds no vector.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Deployment or model name used for embeddings
    fn model_id(&self) -> &str;
}
