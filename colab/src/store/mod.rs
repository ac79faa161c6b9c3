use anyhow::{anyhow, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::parser::Chunk;

mod pinecone;
mod supabase;

pub use pinecone::Pinecone;
pub use supabase::Supabase;

pub const EMBEDDING_SIZE: usize = 1536;

/// Metadata stored next to every vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub document_id: String,
    pub document_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(deserialize_with = "deserialize_index")]
    pub chunk_index: usize,
}

// Pinecone hands numeric metadata back as floats.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn deserialize_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(f64::deserialize(deserializer)?.max(0.0) as usize)
}

impl Payload {
    #[must_use]
    pub fn from_chunk(document_id: &str, document_name: &str, chunk: &Chunk) -> Self {
        Self {
            document_id: document_id.to_string(),
            document_name: document_name.to_string(),
            title: chunk.title.clone(),
            text: chunk.content.clone(),
            chunk_index: chunk.index,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PointStruct {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointResult {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Supabase,
    Pinecone,
}

impl StoreKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Supabase => "supabase",
            Self::Pinecone => "pinecone",
        }
    }
}

impl Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "supabase" => Ok(Self::Supabase),
            "pinecone" => Ok(Self::Pinecone),
            _ => Err(anyhow!("Unknown vector store: {s}")),
        }
    }
}

/// A place embedded chunks can be written to and searched in.
///
/// Searches are always scoped to a set of documents; an empty set matches
/// nothing.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Writes the points, replacing any point with the same id.
    async fn upsert(&self, points: &[PointStruct]) -> Result<()>;

    /// Returns the `count` points closest to `vector` among the given documents.
    async fn similarity_search(
        &self,
        vector: Vec<f32>,
        count: usize,
        documents: &[String],
    ) -> Result<Vec<PointResult>>;

    /// Removes every point belonging to a document.
    async fn delete_document(&self, document_id: &str) -> Result<()>;

    /// Swaps a document's points for a new set.
    async fn replace_document(&self, document_id: &str, points: &[PointStruct]) -> Result<()> {
        self.delete_document(document_id).await?;
        self.upsert(points).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_kinds() {
        assert_eq!("pinecone".parse::<StoreKind>().unwrap(), StoreKind::Pinecone);
        assert_eq!(StoreKind::Supabase.to_string(), "supabase");
        assert!("qdrant".parse::<StoreKind>().is_err());
    }

    #[test]
    fn omits_missing_titles_from_payloads() {
        let payload = Payload {
            document_id: "doc_1".into(),
            document_name: "notes.txt".into(),
            title: None,
            text: "hello".into(),
            chunk_index: 3,
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "documentId": "doc_1",
                "documentName": "notes.txt",
                "text": "hello",
                "chunkIndex": 3,
            })
        );
    }

    #[test]
    fn accepts_float_chunk_indexes() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "documentId": "doc_1",
            "documentName": "notes.txt",
            "title": "Intro",
            "text": "hello",
            "chunkIndex": 7.0,
        }))
        .unwrap();

        assert_eq!(payload.chunk_index, 7);
        assert_eq!(payload.title.as_deref(), Some("Intro"));
    }
}
