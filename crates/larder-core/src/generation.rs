//! Generation provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 8191;

/// Role tag of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// A role-tagged message sent to the generation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// A complete request to the generation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingParams,
    pub max_tokens: u32,
}

/// Usage counters reported by the generation provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Raw provider response: the text of each returned choice, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<String>,
    pub usage: TokenUsage,
}

/// The answer to one user query plus its usage accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    pub prompt_tokens: u32,
    pub response_tokens: u32,
}

/// Trait for generation model providers (Azure OpenAI, self-hosted, ...)
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Send one chat completion request. Fails with `CompletionUnavailable`.
    async fn complete(&self, request: &GenerationRequest) -> Result<ChatCompletion>;

    /// Deployment or model name used for completions
    fn model_id(&self) -> &str;
}
