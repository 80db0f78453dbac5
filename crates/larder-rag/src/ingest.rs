//! Corpus ingestion: identify, embed and upsert documents

use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use larder_core::{Document, DocumentStore, Error, Result};

use crate::embedding::EmbeddingClient;

/// Label used for documents that have no usable name
pub const UNNAMED: &str = "<unnamed>";

/// A document skipped during ingestion and why
#[derive(Debug)]
pub struct IngestionFailure {
    pub document: String,
    pub error: Error,
}

/// Outcome of a best-effort ingestion batch
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub upserted: usize,
    pub failures: Vec<IngestionFailure>,
}

impl IngestionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, document: String, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.upserted += 1,
            Err(error) => {
                warn!(document = %document, error = %error, "skipping document");
                self.failures.push(IngestionFailure { document, error });
            }
        }
    }
}

fn record_label(record: &Map<String, Value>) -> String {
    record
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(UNNAMED)
        .to_string()
}

fn document_label(document: &Document) -> String {
    document.name().unwrap_or(UNNAMED).to_string()
}

/// Embeds documents and upserts them into the store, one document at a time
/// and up to `workers` at once
pub struct IngestionAdapter {
    embedder: Arc<EmbeddingClient>,
    store: Arc<dyn DocumentStore>,
    workers: usize,
}

impl IngestionAdapter {
    pub fn new(
        embedder: Arc<EmbeddingClient>,
        store: Arc<dyn DocumentStore>,
        workers: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            workers: workers.max(1),
        }
    }

    /// Ingest raw source records.
    ///
    /// Records without a usable name are reported as `InvalidDocument`; every
    /// other failure skips only the document it concerns.
    pub async fn ingest(&self, records: Vec<Map<String, Value>>) -> IngestionReport {
        let (documents, mut report) = Self::identify(records);
        let embedded = self.ingest_documents(documents).await;

        report.upserted += embedded.upserted;
        report.failures.extend(embedded.failures);
        report
    }

    /// Embed and upsert documents that already carry an identifier
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> IngestionReport {
        let total = documents.len();

        let outcomes: Vec<(String, Result<()>)> = stream::iter(documents)
            .map(|document| async move {
                let label = document_label(&document);
                (label, self.ingest_one(document).await)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut report = IngestionReport::default();
        for (label, outcome) in outcomes {
            report.record(label, outcome);
        }

        info!(
            total,
            upserted = report.upserted,
            skipped = report.failures.len(),
            "ingestion finished"
        );
        report
    }

    /// Upsert raw source records without embeddings
    pub async fn upload(&self, records: Vec<Map<String, Value>>) -> IngestionReport {
        let (documents, mut report) = Self::identify(records);

        let outcomes: Vec<(String, Result<()>)> = stream::iter(documents)
            .map(|document| async move {
                let label = document_label(&document);
                let outcome = self
                    .store
                    .replace_one(&document.without_embedding())
                    .await;
                (label, outcome)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        for (label, outcome) in outcomes {
            report.record(label, outcome);
        }

        info!(
            upserted = report.upserted,
            skipped = report.failures.len(),
            "upload finished"
        );
        report
    }

    async fn ingest_one(&self, document: Document) -> Result<()> {
        let text = document.embedding_text()?;
        let embedding = self.embedder.embed(&text).await?;
        let document = document.with_embedding(embedding);

        self.store.replace_one(&document).await?;
        debug!(id = %document.id, "upserted document");
        Ok(())
    }

    fn identify(records: Vec<Map<String, Value>>) -> (Vec<Document>, IngestionReport) {
        let mut report = IngestionReport::default();
        let mut documents = Vec::with_capacity(records.len());

        for record in records {
            let label = record_label(&record);
            match Document::from_record(record) {
                Ok(document) => documents.push(document),
                Err(error) => report.record(label, Err(error)),
            }
        }

        (documents, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use crate::testing::{FailingStore, FlakyEmbedder, HashEmbedder, no_delay_retry};
    use serde_json::json;

    fn records(values: Value) -> Vec<Map<String, Value>> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn adapter(
        provider: Arc<dyn larder_core::EmbeddingProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> IngestionAdapter {
        let embedder = Arc::new(EmbeddingClient::new(provider, no_delay_retry(3)));
        IngestionAdapter::new(embedder, store, 4)
    }

    #[tokio::test]
    async fn test_ingest_embeds_and_keys_by_name() {
        let store = Arc::new(MemoryDocumentStore::new());
        let adapter = adapter(Arc::new(HashEmbedder::new(32)), store.clone());

        let report = adapter
            .ingest(records(json!([
                {"name": "Tomato Soup", "ingredients": ["tomatoes", "basil"]},
                {"name": "Pancakes", "ingredients": ["flour", "eggs", "milk"]}
            ])))
            .await;

        assert_eq!(report.upserted, 2);
        assert!(report.is_complete());

        let stored = store.find_all().await.unwrap();
        let ids: Vec<_> = stored.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["pancakes", "tomatosoup"]);
        assert!(stored.iter().all(|d| d.embedding.as_ref().map(|e| e.dimensions()) == Some(32)));
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped_not_fatal() {
        let store = Arc::new(MemoryDocumentStore::new());
        let adapter = adapter(Arc::new(HashEmbedder::new(8)), store.clone());

        let report = adapter
            .ingest(records(json!([
                {"ingredients": ["water"]},
                {"name": "   "},
                {"name": 42},
                {"name": "Gazpacho"}
            ])))
            .await;

        assert_eq!(report.upserted, 1);
        assert_eq!(report.failures.len(), 3);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, Error::InvalidDocument(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_only_that_document() {
        let store = Arc::new(MemoryDocumentStore::new());
        let provider = Arc::new(FlakyEmbedder::poisoned("Burnt", HashEmbedder::new(8)));
        let adapter = adapter(provider, store.clone());

        let report = adapter
            .ingest(records(json!([
                {"name": "Burnt Toast"},
                {"name": "Tomato Soup"}
            ])))
            .await;

        assert_eq!(report.upserted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document, "Burnt Toast");
        assert!(matches!(report.failures[0].error, Error::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_embedding_skips_only_that_document() {
        let store = Arc::new(MemoryDocumentStore::new());
        let provider = Arc::new(FlakyEmbedder::malformed_for("Burnt", HashEmbedder::new(8)));
        let adapter = adapter(provider.clone(), store.clone());

        let report = adapter
            .ingest(records(json!([
                {"name": "Burnt Toast"},
                {"name": "Tomato Soup"},
                {"name": "Pancakes"}
            ])))
            .await;

        assert_eq!(report.upserted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document, "Burnt Toast");
        assert!(matches!(report.failures[0].error, Error::EmbeddingMalformed(_)));
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 3);

        let ids: Vec<_> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["pancakes", "tomatosoup"]);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_per_document() {
        let adapter = adapter(Arc::new(HashEmbedder::new(8)), Arc::new(FailingStore));

        let report = adapter.ingest(records(json!([{"name": "Tomato Soup"}]))).await;

        assert_eq!(report.upserted, 0);
        assert!(matches!(report.failures[0].error, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_reingesting_converges_to_same_state() {
        let store = Arc::new(MemoryDocumentStore::new());
        let adapter = adapter(Arc::new(HashEmbedder::new(16)), store.clone());
        let batch = json!([
            {"name": "Tomato Soup", "servings": 4},
            {"name": "Pancakes"}
        ]);

        adapter.ingest(records(batch.clone())).await;
        let first = store.find_all().await.unwrap();
        adapter.ingest(records(batch)).await;
        let second = store.find_all().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_stores_without_embeddings() {
        let store = Arc::new(MemoryDocumentStore::new());
        let provider = Arc::new(HashEmbedder::new(8));
        let embedder = Arc::new(EmbeddingClient::new(provider.clone(), no_delay_retry(1)));
        let adapter = IngestionAdapter::new(embedder, store.clone(), 2);

        let report = adapter
            .upload(records(json!([{"name": "Tomato Soup"}, {"title": "no name"}])))
            .await;

        assert_eq!(report.upserted, 1);
        assert_eq!(report.failures[0].document, UNNAMED);
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let stored = store.find_all().await.unwrap();
        assert_eq!(stored[0].id, "tomatosoup");
        assert!(stored[0].embedding.is_none());
    }
}
