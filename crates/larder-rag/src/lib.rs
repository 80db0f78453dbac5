//! Retrieval-augmented answering over the Larder recipe corpus
//!
//! Components, in query order:
//!
//! - [`EmbeddingClient`]: embeds text with retry and exponential backoff
//! - [`VectorIndexManager`]: create-if-absent for the store's vector index
//! - [`IngestionAdapter`]: identifies, embeds and upserts corpus documents
//! - [`RetrievalEngine`]: nearest-neighbour search, embeddings projected out
//! - [`AnswerComposer`]: builds the constrained generation request and parses the answer
//!
//! [`RagPipeline`] wires them over one [`DocumentStore`](larder_core::DocumentStore).

pub mod composer;
pub mod config;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod retrieval;
pub mod store;

#[cfg(test)]
mod testing;

pub use composer::{AnswerComposer, SystemInstruction};
pub use config::{RagConfig, StoreBackend};
pub use embedding::EmbeddingClient;
pub use index::{IndexStatus, VectorIndexManager};
pub use ingest::{IngestionAdapter, IngestionFailure, IngestionReport};
pub use pipeline::RagPipeline;
pub use retrieval::RetrievalEngine;
pub use store::{MemoryDocumentStore, QdrantDocumentStore, open_store};

pub use larder_core::{CompletionResult, Document, Error, IndexSpec, Result, SearchResult};
