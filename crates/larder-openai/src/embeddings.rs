//! Embedding client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use larder_core::{EmbeddingProvider, EmbeddingVector, Error, Result};

use crate::client::{HttpClient, Operation};
use crate::config::OpenAiConfig;

/// Embedding client for Azure OpenAI or an OpenAI-compatible server.
///
/// One `embed` call is one provider request; no retries happen here.
pub struct OpenAiEmbeddings {
    http: HttpClient,
    deployment: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    /// Create a new embedding client from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let http = HttpClient::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self {
            http,
            deployment: config.embeddings_deployment.clone(),
            dimensions: config.embedding_dimensions,
        })
    }

    /// Create a new embedding client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenAiConfig::from_env()?;
        Self::new(&config)
    }

    /// Dimensionality every returned vector must have
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Parse an embeddings response body, taking the first vector
pub(crate) fn parse_embedding_response(body: &str, dimensions: usize) -> Result<EmbeddingVector> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::EmbeddingMalformed(format!("embed: invalid response body: {}", e)))?;

    let vector = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| {
            Error::EmbeddingMalformed("embed: response contained no vectors".to_string())
        })?;

    if vector.len() != dimensions {
        return Err(Error::EmbeddingMalformed(format!(
            "embed: expected {} dimensions, got {}",
            dimensions,
            vector.len()
        )));
    }

    Ok(EmbeddingVector::new(vector))
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let request = EmbeddingRequest {
            model: &self.deployment,
            input: text,
        };

        let body = self
            .http
            .post_json(&self.deployment, Operation::Embeddings, &request)
            .await
            .map_err(|e| {
                e.into_error(
                    |message| Error::EmbeddingUnavailable(format!("embed: {}", message)),
                    |message| Error::EmbeddingRejected(format!("embed: {}", message)),
                )
            })?;

        let vector = parse_embedding_response(&body, self.dimensions)?;
        debug!(dimensions = vector.dimensions(), "received embedding");
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        &self.deployment
    }
}
