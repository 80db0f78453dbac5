//! OpenAI-style provider integration for Larder
//!
//! This crate provides the embedding and generation clients for both the
//! vendor-hosted Azure OpenAI service and self-hosted OpenAI-compatible
//! servers. The endpoint variant only changes request routing and
//! authentication; request bodies and response parsing are shared.

mod chat;
mod client;
mod config;
mod embeddings;


pub use chat::OpenAiChat;
pub use config::{Endpoint, OpenAiConfig};
pub use embeddings::OpenAiEmbeddings;

// Re-export core types for convenience
pub use larder_core::{
    ChatCompletion, DEFAULT_MAX_TOKENS, EmbeddingProvider, EmbeddingVector, Error,
    GenerationProvider, GenerationRequest, Result,
};
