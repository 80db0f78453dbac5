//! Qdrant-backed document store
//!
//! The corpus collection maps onto one Qdrant collection. Each vector index is
//! a named cosine vector of that collection, the document identifier is kept
//! in the payload under `_id`, and the point id is a UUID derived from it so
//! that replacing a document overwrites its point.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, ListValue, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, Struct, UpsertPointsBuilder, Value,
    VectorParams, VectorParamsBuilder, VectorsConfigBuilder,
};
use serde_json::{Map, Number};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use larder_core::document::ID_FIELD;
use larder_core::{Document, DocumentStore, EmbeddingVector, Error, IndexSpec, Result};

const SCROLL_PAGE_SIZE: u32 = 256;

/// Document store over a single Qdrant collection
pub struct QdrantDocumentStore {
    client: Qdrant,
    collection: String,
    /// Named vectors every embedding is written under
    vector_names: RwLock<Vec<String>>,
}

impl QdrantDocumentStore {
    /// Create a new store client for `collection` on the server at `url`
    pub fn new(url: &str, api_key: Option<&str>, collection: &str) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| Error::Store(format!("connect to {}: {}", url, e)))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            vector_names: RwLock::new(Vec::new()),
        })
    }

    fn remember(&self, specs: &[IndexSpec]) -> Result<()> {
        let mut names = self
            .vector_names
            .write()
            .map_err(|e| Error::Store(format!("Lock error: {}", e)))?;
        for spec in specs {
            if !names.contains(&spec.name) {
                names.push(spec.name.clone());
            }
        }
        Ok(())
    }

    async fn known_vector_names(&self) -> Result<Vec<String>> {
        let cached = self
            .vector_names
            .read()
            .map_err(|e| Error::Store(format!("Lock error: {}", e)))?
            .clone();
        if !cached.is_empty() {
            return Ok(cached);
        }

        let specs = self.list_indexes().await?;
        Ok(specs.into_iter().map(|s| s.name).collect())
    }
}

fn store_error(operation: &str, e: impl std::fmt::Display) -> Error {
    Error::Store(format!("{}: {}", operation, e))
}

/// Stable point id for a document identifier
pub(crate) fn point_id(id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn cosine_spec(name: &str, params: &VectorParams) -> Option<IndexSpec> {
    (params.distance == Distance::Cosine as i32)
        .then(|| IndexSpec::cosine(name, params.size as usize))
}

pub(crate) fn json_to_value(value: serde_json::Value) -> Value {
    let kind = match value {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(Struct {
            fields: map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect(),
        }),
    };
    Value { kind: Some(kind) }
}

pub(crate) fn value_to_json(value: Value) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

pub(crate) fn document_payload(document: &Document) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = document
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), json_to_value(v.clone())))
        .collect();
    payload.insert(
        ID_FIELD.to_string(),
        json_to_value(serde_json::Value::String(document.id.clone())),
    );
    payload
}

pub(crate) fn payload_document(mut payload: HashMap<String, Value>) -> Result<Document> {
    let id = match payload.remove(ID_FIELD).map(value_to_json) {
        Some(serde_json::Value::String(id)) => id,
        _ => {
            return Err(Error::Store(format!(
                "stored point has no string {} in its payload",
                ID_FIELD
            )));
        }
    };

    let fields: Map<String, serde_json::Value> = payload
        .into_iter()
        .map(|(k, v)| (k, value_to_json(v)))
        .collect();

    Ok(Document {
        id,
        fields,
        embedding: None,
    })
}

#[async_trait]
impl DocumentStore for QdrantDocumentStore {
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| store_error("collection_exists", e))?;
        if !exists {
            return Ok(Vec::new());
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| store_error("collection_info", e))?;

        let specs: Vec<IndexSpec> = match info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
        {
            Some(VectorsConfig::ParamsMap(map)) => {
                let mut specs: Vec<IndexSpec> = map
                    .map
                    .iter()
                    .filter_map(|(name, params)| cosine_spec(name, params))
                    .collect();
                specs.sort_by(|a, b| a.name.cmp(&b.name));
                specs
            }
            // An unnamed vector has no index name to search by
            Some(VectorsConfig::Params(_)) | None => Vec::new(),
        };

        self.remember(&specs)?;
        Ok(specs)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| store_error("collection_exists", e))?;
        if exists {
            return Err(Error::Store(format!(
                "collection {} already exists; its vectors are fixed at creation",
                self.collection
            )));
        }

        let mut vectors = VectorsConfigBuilder::default();
        vectors.add_named_vector_params(
            spec.name.clone(),
            VectorParamsBuilder::new(spec.dimensions as u64, Distance::Cosine),
        );

        let request = CreateCollectionBuilder::new(&self.collection).vectors_config(vectors);
        self.client
            .create_collection(request)
            .await
            .map_err(|e| store_error("create_collection", e))?;

        info!(
            collection = %self.collection,
            index = %spec.name,
            dimensions = spec.dimensions,
            "created qdrant collection"
        );
        self.remember(std::slice::from_ref(spec))
    }

    async fn replace_one(&self, document: &Document) -> Result<()> {
        let mut vectors: HashMap<String, Vec<f32>> = HashMap::new();
        if let Some(embedding) = &document.embedding {
            for name in self.known_vector_names().await? {
                vectors.insert(name, embedding.to_vec());
            }
        }

        let point = PointStruct::new(point_id(&document.id), vectors, document_payload(document));

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| store_error("upsert_points", e))?;

        debug!(id = %document.id, "replaced document");
        Ok(())
    }

    async fn vector_search(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Document>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
                    .vector_name(index)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| store_error("search_points", e))?;

        response
            .result
            .into_iter()
            .map(|point| payload_document(point.payload))
            .collect()
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut offset = None;

        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true)
                .with_vectors(false);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }

            let page = self
                .client
                .scroll(request)
                .await
                .map_err(|e| store_error("scroll", e))?;

            for point in page.result {
                documents.push(payload_document(point.payload)?);
            }

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| store_error("count", e))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or_default())
    }
}
