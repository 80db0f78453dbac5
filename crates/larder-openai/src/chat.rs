//! Chat completion client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use larder_core::{
    ChatCompletion, ChatMessage, Error, GenerationProvider, GenerationRequest, Result, TokenUsage,
};

use crate::client::{HttpClient, Operation};
use crate::config::OpenAiConfig;

/// Chat completion client for Azure OpenAI or an OpenAI-compatible server
pub struct OpenAiChat {
    http: HttpClient,
    deployment: String,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    max_tokens: u32,
}

impl<'a> ChatRequestBody<'a> {
    fn new(model: &'a str, request: &'a GenerationRequest) -> Self {
        Self {
            model,
            messages: &request.messages,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            frequency_penalty: request.sampling.frequency_penalty,
            presence_penalty: request.sampling.presence_penalty,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChoiceData>,
    #[serde(default)]
    usage: UsageData,
}

#[derive(Deserialize)]
struct ChoiceData {
    message: MessageData,
}

#[derive(Deserialize)]
struct MessageData {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct UsageData {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiChat {
    /// Create a new chat client from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let http = HttpClient::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self {
            http,
            deployment: config.completions_deployment.clone(),
        })
    }

    /// Create a new chat client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenAiConfig::from_env()?;
        Self::new(&config)
    }
}

/// Parse a chat completions response body
pub(crate) fn parse_chat_response(body: &str) -> Result<ChatCompletion> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        Error::CompletionUnavailable(format!("complete: invalid response body: {}", e))
    })?;

    Ok(ChatCompletion {
        choices: response
            .choices
            .into_iter()
            .map(|c| c.message.content.unwrap_or_default())
            .collect(),
        usage: TokenUsage {
            prompt_tokens: response.usage.prompt_tokens,
            completion_tokens: response.usage.completion_tokens,
        },
    })
}

#[async_trait]
impl GenerationProvider for OpenAiChat {
    async fn complete(&self, request: &GenerationRequest) -> Result<ChatCompletion> {
        let body = ChatRequestBody::new(&self.deployment, request);

        let text = self
            .http
            .post_json(&self.deployment, Operation::ChatCompletions, &body)
            .await
            .map_err(|e| {
                let wrap =
                    |message: String| Error::CompletionUnavailable(format!("complete: {}", message));
                e.into_error(wrap, wrap)
            })?;

        let completion = parse_chat_response(&text)?;
        debug!(
            choices = completion.choices.len(),
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "received completion"
        );
        Ok(completion)
    }

    fn model_id(&self) -> &str {
        &self.deployment
    }
}
