//! Document store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Document, EmbeddingVector, Result};

/// Similarity metric of a vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    Cosine,
}

/// Description of a vector index over the corpus collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub metric: SimilarityMetric,
    pub dimensions: usize,
}

impl IndexSpec {
    /// A cosine index; the only metric the pipeline uses
    pub fn cosine(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            metric: SimilarityMetric::Cosine,
            dimensions,
        }
    }
}

/// Documents ranked by descending similarity to a query vector, embeddings omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub documents: Vec<Document>,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Trait for the external document store holding the corpus collection.
///
/// One store instance manages exactly one collection. All errors are raw
/// data-access failures (`Error::Store`); components classify them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List the vector indexes defined on the collection
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>>;

    /// Create a vector index on the collection
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Replace-or-insert a document keyed by its identifier
    async fn replace_one(&self, document: &Document) -> Result<()>;

    /// The `k` documents closest to `vector` under the named index, most
    /// similar first, with the embedding field projected out
    async fn vector_search(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Document>>;

    /// Every document in the collection
    async fn find_all(&self) -> Result<Vec<Document>>;

    /// Number of documents in the collection
    async fn count(&self) -> Result<usize>;
}
