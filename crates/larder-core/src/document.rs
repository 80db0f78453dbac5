//! Corpus documents and identifier derivation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EmbeddingVector, Error, Result};

/// Key under which the document identifier is persisted
pub const ID_FIELD: &str = "_id";
/// Content field the identifier is derived from
pub const NAME_FIELD: &str = "name";
/// Key under which the embedding is persisted
pub const EMBEDDING_FIELD: &str = "embedding";

/// A corpus entry.
///
/// `fields` holds the free-form content (name, ingredients, instructions, ...).
/// `embedding` is `None` until the document has been through ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingVector>,
}

/// Derive the stable identifier for a document name: lower-cased, spaces removed.
///
/// Returns `None` when nothing is left of the name.
pub fn derive_identifier(name: &str) -> Option<String> {
    let id = name.to_lowercase().replace(' ', "");
    if id.is_empty() { None } else { Some(id) }
}

impl Document {
    /// Build a document from a raw source record.
    ///
    /// Any `_id` or `embedding` carried by the record is discarded; the
    /// identifier is always re-derived from `name`.
    pub fn from_record(mut record: Map<String, Value>) -> Result<Self> {
        record.remove(ID_FIELD);
        record.remove(EMBEDDING_FIELD);

        let name = record
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::InvalidDocument("record has no string `name` field".to_string())
            })?;

        let id = derive_identifier(name).ok_or_else(|| {
            Error::InvalidDocument(format!("name {:?} yields an empty identifier", name))
        })?;

        Ok(Self {
            id,
            fields: record,
            embedding: None,
        })
    }

    /// The document's `name` field, if present
    pub fn name(&self) -> Option<&str> {
        self.fields.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Text submitted to the embedding model: the content fields as JSON,
    /// without identifier or embedding.
    pub fn embedding_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }

    pub fn with_embedding(mut self, embedding: EmbeddingVector) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn without_embedding(mut self) -> Self {
        self.embedding = None;
        self
    }
}
