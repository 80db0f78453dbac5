//! Vector index management

use std::sync::Arc;
use tracing::{debug, info};

use larder_core::{DocumentStore, Error, IndexSpec, Result};

/// Outcome of [`VectorIndexManager::ensure_index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

/// Guarantees the vector index exists before any search
pub struct VectorIndexManager {
    store: Arc<dyn DocumentStore>,
}

impl VectorIndexManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the index described by `spec` unless one with that name exists.
    ///
    /// An existing index with a different metric or dimensionality is a
    /// configuration mismatch and fails with `IndexCreationFailed`. Nothing
    /// here is retried.
    pub async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStatus> {
        let existing = self.store.list_indexes().await.map_err(|e| {
            Error::IndexCreationFailed(format!("list indexes: {}", store_message(e)))
        })?;

        if let Some(found) = existing.iter().find(|i| i.name == spec.name) {
            if found != spec {
                return Err(Error::IndexCreationFailed(format!(
                    "index {} exists as {:?}/{} dimensions, expected {:?}/{} dimensions",
                    spec.name, found.metric, found.dimensions, spec.metric, spec.dimensions
                )));
            }
            debug!(index = %spec.name, "vector index already exists");
            return Ok(IndexStatus::AlreadyExists);
        }

        self.store.create_index(spec).await.map_err(|e| {
            Error::IndexCreationFailed(format!("create index {}: {}", spec.name, store_message(e)))
        })?;

        info!(index = %spec.name, dimensions = spec.dimensions, "created vector index");
        Ok(IndexStatus::Created)
    }
}

/// The underlying message of a store error, without its category prefix
pub(crate) fn store_message(error: Error) -> String {
    match error {
        Error::Store(message) => message,
        other => other.to_string(),
    }
}
