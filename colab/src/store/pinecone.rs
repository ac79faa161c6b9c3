use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use tracing::debug;

use super::{Payload, PointResult, PointStruct, StoreKind, VectorStore};

const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    score: f32,
    metadata: Option<Payload>,
}

/// Pinecone index, spoken to over its data-plane REST API.
#[derive(Debug, Clone)]
pub struct Pinecone {
    client: Client,
    base_url: String,
    api_key: String,
    namespace: Option<String>,
}

impl Pinecone {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            namespace: None,
        }
    }

    /// Reads `PINECONE_INDEX_HOST`, `PINECONE_API_KEY` and the optional
    /// `PINECONE_NAMESPACE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or the key are not set.
    pub fn from_env() -> Result<Self> {
        let host = env::var("PINECONE_INDEX_HOST").context("PINECONE_INDEX_HOST not set")?;
        let api_key = env::var("PINECONE_API_KEY").context("PINECONE_API_KEY not set")?;
        let base_url = if host.starts_with("http") {
            host
        } else {
            format!("https://{host}")
        };

        let pinecone = Self::new(base_url, api_key);

        Ok(match env::var("PINECONE_NAMESPACE") {
            Ok(namespace) if !namespace.is_empty() => pinecone.namespace(&namespace),
            _ => pinecone,
        })
    }

    #[must_use]
    pub fn namespace(self, name: &str) -> Self {
        Self {
            namespace: Some(name.to_string()),
            ..self
        }
    }

    fn body(&self, mut body: Value) -> Value {
        if let Some(namespace) = &self.namespace {
            body["namespace"] = json!(namespace);
        }

        body
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&self.body(body))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl VectorStore for Pinecone {
    fn kind(&self) -> StoreKind {
        StoreKind::Pinecone
    }

    async fn upsert(&self, points: &[PointStruct]) -> Result<()> {
        try_join_all(points.chunks(UPSERT_BATCH_SIZE).map(|chunk| {
            let vectors = chunk
                .iter()
                .map(|point| {
                    json!({
                        "id": point.id,
                        "values": point.vector,
                        "metadata": point.payload,
                    })
                })
                .collect::<Vec<_>>();

            self.post("/vectors/upsert", json!({ "vectors": vectors }))
        }))
        .await?;

        debug!("Upserted {} vectors", points.len());

        Ok(())
    }

    async fn similarity_search(
        &self,
        vector: Vec<f32>,
        count: usize,
        documents: &[String],
    ) -> Result<Vec<PointResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .post(
                "/query",
                json!({
                    "vector": vector,
                    "topK": count,
                    "includeMetadata": true,
                    "filter": { "documentId": { "$in": documents } },
                }),
            )
            .await?;

        let response: QueryResponse = serde_json::from_value(response)?;

        response
            .matches
            .into_iter()
            .map(|m| {
                Ok(PointResult {
                    payload: m
                        .metadata
                        .ok_or_else(|| anyhow!("Vector {} has no metadata", m.id))?,
                    id: m.id,
                    score: m.score,
                })
            })
            .collect()
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.post(
            "/vectors/delete",
            json!({ "filter": { "documentId": { "$eq": document_id } } }),
        )
        .await?;

        debug!("Deleted vectors for {document_id}");

        Ok(())
    }
}
