//! Embedding client with retry and exponential backoff

use std::sync::Arc;
use tracing::{debug, warn};

use larder_core::{EmbeddingProvider, EmbeddingVector, Error, Result, RetryConfig};

/// Retrying wrapper around a raw embedding provider.
///
/// Ingestion and query answering share one instance, so both see the same
/// retry policy. Only transient failures are retried; `EmbeddingRejected`
/// and `EmbeddingMalformed` are returned on the first occurrence.
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryConfig,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, retry: RetryConfig) -> Self {
        Self { provider, retry }
    }

    /// Embed `text`, retrying transient provider failures up to
    /// `max_attempts` calls in total.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.provider.embed(text).await {
                Ok(vector) => {
                    if attempt > 1 {
                        debug!(attempt, "embedding succeeded after retry");
                    }
                    return Ok(vector);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "embedding call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Error::EmbeddingUnavailable(message)) => {
                    return Err(Error::EmbeddingUnavailable(format!(
                        "{} (gave up after {} attempts)",
                        message, attempt
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
