//! Answer composition: embed, retrieve, then generate from the retrieved documents

use std::sync::Arc;
use tracing::{debug, info};

use larder_core::{
    ChatMessage, CompletionResult, DEFAULT_MAX_TOKENS, Document, Error, GenerationProvider,
    GenerationRequest, Result, SamplingParams,
};

use crate::embedding::EmbeddingClient;
use crate::retrieval::RetrievalEngine;

/// Separates the instruction from the serialized documents in the system message
pub const DOCUMENTS_HEADER: &str = "\n\nDocuments:\n";

const RECIPE_ASSISTANT_INSTRUCTION: &str = "\
You are an assistant that helps people find and cook recipes. \
Answer only from the recipe documents listed below. \
Never use outside knowledge, and never invent recipes, ingredients or steps that are not in the documents. \
If you are not sure of the answer, say \"I don't know\". \
If the list of documents is empty, tell the user that no matching recipe was found. \
Begin your answer with the name of the recipe. \
Format the answer as plain text for a terminal: no markdown, no HTML.";

/// The instruction that constrains the generation model.
///
/// Fixed when the composer is built and never changed afterwards; the user's
/// query only ever reaches the model as the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstruction(Arc<str>);

impl SystemInstruction {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SystemInstruction {
    /// The recipe assistant instruction
    fn default() -> Self {
        Self::new(RECIPE_ASSISTANT_INSTRUCTION)
    }
}

/// Answers user queries from the retrieved corpus documents
pub struct AnswerComposer {
    embedder: Arc<EmbeddingClient>,
    retrieval: Arc<RetrievalEngine>,
    generator: Arc<dyn GenerationProvider>,
    instruction: SystemInstruction,
    max_tokens: u32,
}

impl AnswerComposer {
    /// Create a new composer using the default token budget
    pub fn new(
        embedder: Arc<EmbeddingClient>,
        retrieval: Arc<RetrievalEngine>,
        generator: Arc<dyn GenerationProvider>,
        instruction: SystemInstruction,
    ) -> Self {
        Self {
            embedder,
            retrieval,
            generator,
            instruction,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Answer `query` from the documents closest to it.
    ///
    /// Embedding and search failures propagate unchanged. An empty search
    /// result is not an error: the model is asked anyway, with no documents.
    pub async fn answer(&self, query: &str) -> Result<CompletionResult> {
        let vector = self.embedder.embed(query).await?;
        let found = self.retrieval.retrieve(&vector).await?;
        if found.is_empty() {
            info!("no documents matched the query");
        }

        let request = self.build_request(query, &found.documents)?;
        debug!(
            documents = found.len(),
            max_tokens = request.max_tokens,
            "sending completion request"
        );

        let completion = self.generator.complete(&request).await.map_err(|e| match e {
            Error::CompletionUnavailable(_) => e,
            other => Error::CompletionUnavailable(format!("complete: {}", other)),
        })?;

        let text = completion.choices.into_iter().next().ok_or_else(|| {
            Error::CompletionUnavailable("complete: response contained no choices".to_string())
        })?;

        info!(
            prompt_tokens = completion.usage.prompt_tokens,
            response_tokens = completion.usage.completion_tokens,
            "answered query"
        );

        Ok(CompletionResult {
            text,
            prompt_tokens: completion.usage.prompt_tokens,
            response_tokens: completion.usage.completion_tokens,
        })
    }

    /// The generation request for `query` over `documents`
    pub fn build_request(&self, query: &str, documents: &[Document]) -> Result<GenerationRequest> {
        let documents: Vec<Document> = documents
            .iter()
            .cloned()
            .map(Document::without_embedding)
            .collect();
        let serialized = serde_json::to_string_pretty(&documents)?;

        let mut context = String::from(self.instruction.as_str());
        context.push_str(DOCUMENTS_HEADER);
        context.push_str(&serialized);

        Ok(GenerationRequest {
            messages: vec![ChatMessage::system(context), ChatMessage::user(query)],
            sampling: SamplingParams::default(),
            max_tokens: self.max_tokens,
        })
    }
}
