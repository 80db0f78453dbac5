//! Document store backends

mod memory;
mod qdrant;

pub use memory::MemoryDocumentStore;
pub use qdrant::QdrantDocumentStore;

use std::sync::Arc;
use tracing::info;

use larder_core::{DocumentStore, Result};

use crate::config::{RagConfig, StoreBackend};

/// Open the document store selected by the configuration
pub fn open_store(config: &RagConfig) -> Result<Arc<dyn DocumentStore>> {
    match &config.store {
        StoreBackend::Memory => {
            info!("using in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        StoreBackend::Qdrant { url, api_key } => {
            info!(url = %url, collection = %config.collection, "using qdrant document store");
            let store = QdrantDocumentStore::new(url, api_key.as_deref(), &config.collection)?;
            Ok(Arc::new(store))
        }
    }
}
