//! Shared HTTP plumbing for both endpoint variants

use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use larder_core::{Error, Result};

use crate::config::Endpoint;

/// Provider operation, mapped to a URL path per endpoint variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Embeddings,
    ChatCompletions,
}

impl Operation {
    fn segments(self) -> &'static [&'static str] {
        match self {
            Operation::Embeddings => &["embeddings"],
            Operation::ChatCompletions => &["chat", "completions"],
        }
    }
}

impl Endpoint {
    /// Build the request URL for a deployment and operation
    pub(crate) fn url(&self, deployment: &str, operation: Operation) -> Result<Url> {
        let (base, prefix): (&str, Vec<&str>) = match self {
            Endpoint::Azure { endpoint, .. } => {
                (endpoint.as_str(), vec!["openai", "deployments", deployment])
            }
            Endpoint::SelfHosted { base_url, .. } => (base_url.as_str(), Vec::new()),
        };

        let mut url = Url::parse(base)
            .map_err(|e| Error::Configuration(format!("invalid endpoint URL {:?}: {}", base, e)))?;

        url.path_segments_mut()
            .map_err(|_| Error::Configuration(format!("endpoint URL {:?} cannot be a base", base)))?
            .pop_if_empty()
            .extend(prefix)
            .extend(operation.segments());

        if let Endpoint::Azure { api_version, .. } = self {
            url.query_pairs_mut().append_pair("api-version", api_version);
        }

        Ok(url)
    }
}

/// HTTP client bound to one endpoint
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: Client,
    endpoint: Endpoint,
}

impl HttpClient {
    pub(crate) fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    /// POST a JSON body and return the response text
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        deployment: &str,
        operation: Operation,
        body: &B,
    ) -> std::result::Result<String, RequestError> {
        let url = self
            .endpoint
            .url(deployment, operation)
            .map_err(RequestError::Config)?;
        debug!(%url, ?operation, "sending provider request");

        let mut request = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .json(body);

        request = match &self.endpoint {
            Endpoint::Azure { api_key, .. } => request.header("api-key", api_key),
            Endpoint::SelfHosted { api_key: Some(key), .. } => request.bearer_auth(key),
            Endpoint::SelfHosted { api_key: None, .. } => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| RequestError::Provider(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RequestError::Provider(format!("failed to read response body: {}", e)))?;

        if status.is_success() {
            return Ok(text);
        }

        let message = format!("provider returned status {}: {}", status, text);
        if is_retryable_status(status) {
            Err(RequestError::Provider(message))
        } else {
            Err(RequestError::Rejected(message))
        }
    }
}

/// Whether a non-success status may clear up on its own. Throttling, request
/// timeouts and server errors qualify; any other client error is final.
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Failure of a provider request
#[derive(Debug)]
pub(crate) enum RequestError {
    /// The endpoint configuration cannot produce a request
    Config(Error),
    /// Transport failure or a status worth retrying
    Provider(String),
    /// The provider refused the request itself
    Rejected(String),
}

impl RequestError {
    /// Map onto the caller's error variants; configuration errors pass through
    pub(crate) fn into_error(
        self,
        unavailable: fn(String) -> Error,
        rejected: fn(String) -> Error,
    ) -> Error {
        match self {
            RequestError::Config(e) => e,
            RequestError::Provider(message) => unavailable(message),
            RequestError::Rejected(message) => rejected(message),
        }
    }
}
