//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use larder_core::{Error, IndexSpec, Result, RetryConfig};

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_COLLECTION: &str = "recipes";
const DEFAULT_INDEX: &str = "VectorSearchIndex";
const DEFAULT_TOP_K: usize = 3;
const MAX_TOP_K: usize = 10;
const DEFAULT_INGEST_WORKERS: usize = 4;

/// Which document store backs the corpus collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Qdrant { url: String, api_key: Option<String> },
}

/// Configuration for the retrieval-augmented pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub store: StoreBackend,
    pub collection: String,
    pub index_name: String,
    pub top_k: usize,
    pub ingest_workers: usize,
    pub retry: RetryConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Qdrant {
                url: DEFAULT_QDRANT_URL.to_string(),
                api_key: None,
            },
            collection: DEFAULT_COLLECTION.to_string(),
            index_name: DEFAULT_INDEX.to_string(),
            top_k: DEFAULT_TOP_K,
            ingest_workers: DEFAULT_INGEST_WORKERS,
            retry: RetryConfig::default(),
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let store = match lookup("LARDER_STORE")
            .unwrap_or_else(|| "qdrant".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "qdrant" => StoreBackend::Qdrant {
                url: lookup("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
                api_key: lookup("QDRANT_API_KEY").filter(|k| !k.trim().is_empty()),
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(Error::Configuration(format!(
                    "LARDER_STORE must be `qdrant` or `memory`, got {:?}",
                    other
                )));
            }
        };

        let top_k = parse_bounded(&lookup, "LARDER_TOP_K", DEFAULT_TOP_K, 1, MAX_TOP_K)?;
        let ingest_workers =
            parse_bounded(&lookup, "LARDER_INGEST_WORKERS", DEFAULT_INGEST_WORKERS, 1, 64)?;
        let max_attempts = parse_bounded(
            &lookup,
            "EMBEDDING_MAX_ATTEMPTS",
            defaults.retry.max_attempts as usize,
            1,
            100,
        )?;
        let base_delay_ms = parse_bounded(
            &lookup,
            "EMBEDDING_RETRY_BASE_DELAY_MS",
            defaults.retry.base_delay.as_millis() as usize,
            0,
            60_000,
        )?;

        Ok(Self {
            store,
            collection: lookup("LARDER_COLLECTION").unwrap_or(defaults.collection),
            index_name: lookup("LARDER_INDEX").unwrap_or(defaults.index_name),
            top_k,
            ingest_workers,
            retry: defaults
                .retry
                .with_max_attempts(max_attempts as u32)
                .with_base_delay(Duration::from_millis(base_delay_ms as u64)),
        })
    }

    /// The cosine index the pipeline searches, sized for the embedding model
    pub fn index_spec(&self, dimensions: usize) -> IndexSpec {
        IndexSpec::cosine(&self.index_name, dimensions)
    }
}

fn parse_bounded<F>(lookup: &F, key: &str, default: usize, min: usize, max: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| {
            Error::Configuration(format!(
                "{} must be an integer between {} and {}, got {:?}",
                key, min, max, raw
            ))
        })
}
