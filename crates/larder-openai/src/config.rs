//! Provider configuration

use serde::{Deserialize, Serialize};
use std::env;
use larder_core::{DEFAULT_MAX_TOKENS, Error, Result};

const DEFAULT_API_VERSION: &str = "2024-02-01";
const DEFAULT_EMBEDDINGS_DEPLOYMENT: &str = "text-embedding-ada-002";
const DEFAULT_COMPLETIONS_DEPLOYMENT: &str = "gpt-35-turbo";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where provider requests are routed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Endpoint {
    /// Vendor-hosted Azure OpenAI resource; deployments are addressed by path
    Azure {
        endpoint: String,
        api_key: String,
        api_version: String,
    },
    /// Self-hosted OpenAI-compatible server, e.g. `http://localhost:8000/v1`
    SelfHosted {
        base_url: String,
        api_key: Option<String>,
    },
}

/// Configuration for the embedding and generation clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub endpoint: Endpoint,
    pub embeddings_deployment: String,
    pub completions_deployment: String,
    pub embedding_dimensions: usize,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
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
        let required = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                Error::Configuration(format!("{} environment variable not found", key))
            })
        };

        let variant = lookup("LARDER_ENDPOINT").unwrap_or_else(|| "azure".to_string());
        let endpoint = match variant.trim().to_lowercase().as_str() {
            "azure" => Endpoint::Azure {
                endpoint: required("AZURE_OPENAI_ENDPOINT")?,
                api_key: required("AZURE_OPENAI_API_KEY")?,
                api_version: lookup("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            },
            "self-hosted" | "selfhosted" | "local" => Endpoint::SelfHosted {
                base_url: required("OPENAI_BASE_URL")?,
                api_key: lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()),
            },
            other => {
                return Err(Error::Configuration(format!(
                    "LARDER_ENDPOINT must be `azure` or `self-hosted`, got {:?}",
                    other
                )));
            }
        };

        let embedding_dimensions = match lookup("EMBEDDING_DIMENSIONS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "EMBEDDING_DIMENSIONS is not a positive integer: {:?}",
                        raw
                    ))
                })?,
            None => DEFAULT_EMBEDDING_DIMENSIONS,
        };

        let timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            endpoint,
            embeddings_deployment: lookup("EMBEDDINGS_DEPLOYMENT_NAME")
                .unwrap_or_else(|| DEFAULT_EMBEDDINGS_DEPLOYMENT.to_string()),
            completions_deployment: lookup("COMPLETIONS_DEPLOYMENT_NAME")
                .unwrap_or_else(|| DEFAULT_COMPLETIONS_DEPLOYMENT.to_string()),
            embedding_dimensions,
            max_tokens: parse_max_tokens(lookup("MAX_TOKENS").as_deref()),
            timeout_secs,
        })
    }

    /// Create an Azure configuration with explicit values
    pub fn azure(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::Azure {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Create a self-hosted configuration with explicit values
    pub fn self_hosted(base_url: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::SelfHosted {
            base_url: base_url.into(),
            api_key: None,
        })
    }

    fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            embeddings_deployment: DEFAULT_EMBEDDINGS_DEPLOYMENT.to_string(),
            completions_deployment: DEFAULT_COMPLETIONS_DEPLOYMENT.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Parse the output token cap, falling back to the default when unset or unparsable
pub(crate) fn parse_max_tokens(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_TOKENS)
}
