//! Retrieval-augmented answering pipeline

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use larder_core::{
    CompletionResult, DocumentStore, EmbeddingProvider, GenerationProvider, IndexSpec, Result,
};

use crate::composer::{AnswerComposer, SystemInstruction};
use crate::config::RagConfig;
use crate::embedding::EmbeddingClient;
use crate::index::{IndexStatus, VectorIndexManager};
use crate::ingest::{IngestionAdapter, IngestionReport};
use crate::retrieval::RetrievalEngine;

/// Wires the pipeline components over one store and one pair of providers.
///
/// A single [`EmbeddingClient`] is shared by ingestion and query answering so
/// both embed under the same retry policy.
pub struct RagPipeline {
    store: Arc<dyn DocumentStore>,
    index_spec: IndexSpec,
    indexes: VectorIndexManager,
    ingestion: IngestionAdapter,
    composer: AnswerComposer,
}

impl RagPipeline {
    /// Create a new pipeline.
    ///
    /// `dimensions` is the embedding model's output size; the vector index is
    /// created with it.
    pub fn new(
        config: &RagConfig,
        store: Arc<dyn DocumentStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        dimensions: usize,
        generator: Arc<dyn GenerationProvider>,
        instruction: SystemInstruction,
        max_tokens: u32,
    ) -> Self {
        let embedder = Arc::new(EmbeddingClient::new(embeddings, config.retry));
        let retrieval = Arc::new(RetrievalEngine::new(
            store.clone(),
            config.index_name.clone(),
            config.top_k,
        ));

        Self {
            index_spec: config.index_spec(dimensions),
            indexes: VectorIndexManager::new(store.clone()),
            ingestion: IngestionAdapter::new(
                embedder.clone(),
                store.clone(),
                config.ingest_workers,
            ),
            composer: AnswerComposer::new(embedder, retrieval, generator, instruction)
                .with_max_tokens(max_tokens),
            store,
        }
    }

    pub fn index_spec(&self) -> &IndexSpec {
        &self.index_spec
    }

    /// Make sure the vector index exists; safe on every startup
    pub async fn ensure_index(&self) -> Result<IndexStatus> {
        self.indexes.ensure_index(&self.index_spec).await
    }

    /// Store raw records without embeddings
    pub async fn upload(&self, records: Vec<Map<String, Value>>) -> IngestionReport {
        self.ingestion.upload(records).await
    }

    /// Embed and store raw records
    pub async fn ingest(&self, records: Vec<Map<String, Value>>) -> IngestionReport {
        self.ingestion.ingest(records).await
    }

    /// Ensure the index, then embed every stored document
    pub async fn vectorize(&self) -> Result<IngestionReport> {
        self.ensure_index().await?;

        let documents = self.store.find_all().await?;
        info!(documents = documents.len(), "vectorizing stored corpus");

        Ok(self.ingestion.ingest_documents(documents).await)
    }

    /// Answer a user query from the corpus
    pub async fn answer(&self, query: &str) -> Result<CompletionResult> {
        self.composer.answer(query).await
    }

    pub async fn document_count(&self) -> Result<usize> {
        self.store.count().await
    }
}
