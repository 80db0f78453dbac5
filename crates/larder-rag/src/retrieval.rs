//! Nearest-neighbour retrieval over the vector index

use std::sync::Arc;
use tracing::debug;

use larder_core::{DocumentStore, EmbeddingVector, Error, Result, SearchResult};

use crate::index::store_message;

/// Queries the store's vector index for the documents closest to a vector
pub struct RetrievalEngine {
    store: Arc<dyn DocumentStore>,
    index_name: String,
    top_k: usize,
}

impl RetrievalEngine {
    /// Create a new retrieval engine over `index_name`, returning `top_k`
    /// documents per query by default
    pub fn new(store: Arc<dyn DocumentStore>, index_name: impl Into<String>, top_k: usize) -> Self {
        Self {
            store,
            index_name: index_name.into(),
            top_k,
        }
    }

    /// The `k` documents most similar to `vector`, most similar first.
    ///
    /// Returned documents never carry an embedding. Store failures surface
    /// as `SearchUnavailable` and are not retried.
    pub async fn search(&self, vector: &EmbeddingVector, k: usize) -> Result<SearchResult> {
        if k == 0 {
            return Ok(SearchResult::default());
        }

        let mut documents = self
            .store
            .vector_search(&self.index_name, vector, k)
            .await
            .map_err(|e| {
                Error::SearchUnavailable(format!(
                    "vector search on {}: {}",
                    self.index_name,
                    store_message(e)
                ))
            })?;

        documents.truncate(k);
        let documents: Vec<_> = documents.into_iter().map(|d| d.without_embedding()).collect();

        debug!(k, found = documents.len(), "vector search complete");
        Ok(SearchResult { documents })
    }

    /// Search with the configured `top_k`
    pub async fn retrieve(&self, vector: &EmbeddingVector) -> Result<SearchResult> {
        self.search(vector, self.top_k).await
    }
}
