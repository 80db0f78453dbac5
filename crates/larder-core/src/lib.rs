//! Core traits and types for Larder
//!
//! This crate defines the data model and the seams of the retrieval-augmented
//! answering pipeline: the embedding and generation provider traits, the
//! document store trait, and the error taxonomy shared by every component.

pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod store;
pub mod types;


pub use document::{Document, derive_identifier};
pub use embedding::{EmbeddingProvider, EmbeddingVector};
pub use error::{Error, Result};
pub use generation::{
    ChatCompletion, ChatMessage, ChatRole, CompletionResult, DEFAULT_MAX_TOKENS,
    GenerationProvider, GenerationRequest, SamplingParams, TokenUsage,
};
pub use store::{DocumentStore, IndexSpec, SearchResult, SimilarityMetric};
pub use types::RetryConfig;
