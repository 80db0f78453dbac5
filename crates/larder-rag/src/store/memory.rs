//! In-memory document store

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use larder_core::{Document, DocumentStore, EmbeddingVector, Error, IndexSpec, Result};

/// Local in-memory document store with brute-force cosine search.
///
/// Used for tests and for running the pipeline without a Qdrant server.
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<String, Document>>>,
    indexes: Arc<RwLock<Vec<IndexSpec>>>,
}

impl MemoryDocumentStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            indexes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn lock_error(e: impl std::fmt::Display) -> Error {
        Error::Store(format!("Lock error: {}", e))
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        let indexes = self.indexes.read().map_err(Self::lock_error)?;
        Ok(indexes.clone())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write().map_err(Self::lock_error)?;
        if indexes.iter().any(|i| i.name == spec.name) {
            return Err(Error::Store(format!("index {} already exists", spec.name)));
        }
        indexes.push(spec.clone());
        Ok(())
    }

    async fn replace_one(&self, document: &Document) -> Result<()> {
        let mut docs = self.documents.write().map_err(Self::lock_error)?;
        docs.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn vector_search(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Document>> {
        let dimensions = {
            let indexes = self.indexes.read().map_err(Self::lock_error)?;
            indexes
                .iter()
                .find(|i| i.name == index)
                .map(|i| i.dimensions)
                .ok_or_else(|| Error::Store(format!("no vector index named {}", index)))?
        };

        if vector.dimensions() != dimensions {
            return Err(Error::Store(format!(
                "query vector has {} dimensions, index {} expects {}",
                vector.dimensions(),
                index,
                dimensions
            )));
        }

        let docs = self.documents.read().map_err(Self::lock_error)?;

        let mut scored: Vec<(f32, &Document)> = docs
            .values()
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref()?;
                (embedding.dimensions() == dimensions)
                    .then(|| (vector.cosine_similarity(embedding), doc))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, doc)| doc.clone().without_embedding())
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        let docs = self.documents.read().map_err(Self::lock_error)?;
        let mut all: Vec<Document> = docs.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn count(&self) -> Result<usize> {
        let docs = self.documents.read().map_err(Self::lock_error)?;
        Ok(docs.len())
    }
}
