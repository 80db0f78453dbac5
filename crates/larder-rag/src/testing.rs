//! Deterministic provider and store doubles shared by the crate's tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use larder_core::{
    ChatCompletion, ChatRole, Document, DocumentStore, EmbeddingProvider, EmbeddingVector, Error,
    GenerationProvider, GenerationRequest, IndexSpec, Result, RetryConfig, TokenUsage,
};

use crate::composer::DOCUMENTS_HEADER;
use crate::store::MemoryDocumentStore;

pub(crate) fn no_delay_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::ZERO)
}

/// Hashed bag-of-words embedder: texts sharing words land close together
pub(crate) struct HashEmbedder {
    dimensions: usize,
    pub(crate) calls: AtomicU32,
}

impl HashEmbedder {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicU32::new(0),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let mut embedding = vec![0.0f32; self.dimensions];
        for word in normalized.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            embedding[(hasher.finish() as usize) % self.dimensions] += 1.0;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingVector::new(self.vectorize(text)))
    }

    fn model_id(&self) -> &str {
        "hash-embedder"
    }
}

enum Flake {
    Unavailable,
    Rejected,
    Malformed,
}

/// Embedder that fails a number of calls before delegating
pub(crate) struct FlakyEmbedder {
    failures: u32,
    flake: Flake,
    inner: Option<HashEmbedder>,
    /// Fail any text containing this marker, on every call
    poison: Option<String>,
    pub(crate) calls: AtomicU32,
}

impl FlakyEmbedder {
    pub(crate) fn always_unavailable() -> Self {
        Self::new(u32::MAX, Flake::Unavailable, None)
    }

    pub(crate) fn always_malformed() -> Self {
        Self::new(u32::MAX, Flake::Malformed, None)
    }

    pub(crate) fn always_rejected() -> Self {
        Self::new(u32::MAX, Flake::Rejected, None)
    }

    pub(crate) fn failing_first(failures: u32, inner: HashEmbedder) -> Self {
        Self::new(failures, Flake::Unavailable, Some(inner))
    }

    pub(crate) fn poisoned(marker: &str, inner: HashEmbedder) -> Self {
        Self::new(0, Flake::Unavailable, Some(inner)).with_poison(marker)
    }

    /// Answers texts containing `marker` with an empty response
    pub(crate) fn malformed_for(marker: &str, inner: HashEmbedder) -> Self {
        Self::new(0, Flake::Malformed, Some(inner)).with_poison(marker)
    }

    fn with_poison(mut self, marker: &str) -> Self {
        self.poison = Some(marker.to_string());
        self
    }

    fn new(failures: u32, flake: Flake, inner: Option<HashEmbedder>) -> Self {
        Self {
            failures,
            flake,
            inner,
            poison: None,
            calls: AtomicU32::new(0),
        }
    }

    fn failure(&self) -> Error {
        match self.flake {
            Flake::Unavailable => {
                Error::EmbeddingUnavailable("embed: connection refused".to_string())
            }
            Flake::Rejected => Error::EmbeddingRejected(
                "embed: provider returned status 400 Bad Request: input too long".to_string(),
            ),
            Flake::Malformed => {
                Error::EmbeddingMalformed("embed: response contained no vectors".to_string())
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let poisoned = self.poison.as_deref().is_some_and(|m| text.contains(m));
        if call < self.failures || poisoned {
            return Err(self.failure());
        }
        match &self.inner {
            Some(inner) => inner.embed(text).await,
            None => Err(self.failure()),
        }
    }

    fn model_id(&self) -> &str {
        "flaky-embedder"
    }
}

/// Documents embedded in the system message of a request
pub(crate) fn context_documents(request: &GenerationRequest) -> Vec<Value> {
    request
        .messages
        .iter()
        .find(|m| m.role == ChatRole::System)
        .and_then(|m| m.content.split_once(DOCUMENTS_HEADER))
        .and_then(|(_, json)| serde_json::from_str::<Vec<Value>>(json.trim()).ok())
        .unwrap_or_default()
}

/// Generator that answers with the first context document's name, or admits
/// it doesn't know when the context is empty
pub(crate) struct ScriptedGenerator {
    pub(crate) requests: Mutex<Vec<GenerationRequest>>,
    fail: bool,
}

impl ScriptedGenerator {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<ChatCompletion> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(Error::CompletionUnavailable(
                "complete: provider returned status 429".to_string(),
            ));
        }

        let answer = match context_documents(request).first().and_then(|d| d["name"].as_str()) {
            Some(name) => format!("{}\nFollow the instructions in the recipe.", name),
            None => "I don't know. No matching recipe was found.".to_string(),
        };

        let prompt_tokens: usize = request
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum();

        Ok(ChatCompletion {
            usage: TokenUsage {
                prompt_tokens: prompt_tokens as u32,
                completion_tokens: answer.split_whitespace().count() as u32,
            },
            choices: vec![answer],
        })
    }

    fn model_id(&self) -> &str {
        "scripted-generator"
    }
}

/// Memory store that counts index creation calls
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryDocumentStore,
    pub(crate) create_calls: AtomicUsize,
    reject_creates: bool,
}

impl CountingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            create_calls: AtomicUsize::new(0),
            reject_creates: false,
        }
    }

    /// Lists indexes normally but refuses every create request
    pub(crate) fn rejecting_creates() -> Self {
        Self {
            reject_creates: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        self.inner.list_indexes().await
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_creates {
            return Err(Error::Store(
                "create_collection: status 400 Bad Request: invalid vector size".to_string(),
            ));
        }
        self.inner.create_index(spec).await
    }

    async fn replace_one(&self, document: &Document) -> Result<()> {
        self.inner.replace_one(document).await
    }

    async fn vector_search(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Document>> {
        self.inner.vector_search(index, vector, k).await
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        self.inner.find_all().await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// Store whose every call fails with a data-access error
pub(crate) struct FailingStore;

impl FailingStore {
    fn error(operation: &str) -> Error {
        Error::Store(format!("{}: connection reset by peer", operation))
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        Err(Self::error("list_indexes"))
    }

    async fn create_index(&self, _spec: &IndexSpec) -> Result<()> {
        Err(Self::error("create_index"))
    }

    async fn replace_one(&self, _document: &Document) -> Result<()> {
        Err(Self::error("replace_one"))
    }

    async fn vector_search(
        &self,
        _index: &str,
        _vector: &EmbeddingVector,
        _k: usize,
    ) -> Result<Vec<Document>> {
        Err(Self::error("vector_search"))
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        Err(Self::error("find_all"))
    }

    async fn count(&self) -> Result<usize> {
        Err(Self::error("count"))
    }
}
