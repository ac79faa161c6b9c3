use axum::extract::{Path, State};
use axum_jsonschema::Json;
use colab::{parse_document, ChunkOptions, DocumentKind, PointStruct, StoreKind, VectorStore};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    axum::{
        errors::{ApiError, ApiResult},
        extractors::User,
        state::AppState,
    },
    models::document,
    utils::influx,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    document_id: String,
    #[validate(range(min = 1))]
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    document_id: String,
    vector_store: StoreKind,
    chunks: usize,
}

/// Moves a document's vectors into `target`. A different previous store only
/// has the old vectors removed.
async fn replace_vectors(
    previous: Option<&dyn VectorStore>,
    target: &dyn VectorStore,
    document_id: &str,
    points: &[PointStruct],
) -> anyhow::Result<()> {
    if let Some(previous) = previous.filter(|store| store.kind() != target.kind()) {
        previous.delete_document(document_id).await?;
    }

    target.replace_document(document_id, points).await
}

/// Chunks and embeds one of the user's documents into the given store,
/// replacing whatever vectors the document had before.
pub async fn store(
    User(user): User,
    State(state): State<AppState>,
    Path(kind): Path<StoreKind>,
    Json(req): Json<Request>,
) -> ApiResult<Json<Response>> {
    req.validate()?;

    let document = document::find_for_user(&state.db, &req.document_id, &user.id)
        .await?
        .ok_or(ApiError::DocumentNotFound)?;
    let store = state.store(kind)?;

    let defaults = ChunkOptions::default();
    let options = ChunkOptions {
        chunk_size: req.chunk_size.unwrap_or(defaults.chunk_size),
        chunk_overlap: req.chunk_overlap.unwrap_or(defaults.chunk_overlap),
    };

    let parsed = parse_document(
        &document.name,
        &document.content,
        DocumentKind::from_content_type(&document.content_type),
        options,
    )
    .map_err(|err| ApiError::ClientError(err.to_string()))?;

    if parsed.chunks.is_empty() {
        return Err(ApiError::ClientError(
            "Document has no content to embed.".to_string(),
        ));
    }

    let points = state
        .openai
        .embed(&document.id, &document.name, &parsed.chunks)
        .await?;

    let previous = match document.vector_store() {
        Some(previous) => {
            document::mark_unembedded(&state.db, &document.id).await?;
            Some(state.store(previous)?)
        }
        None => None,
    };
    replace_vectors(previous.as_deref(), store.as_ref(), &document.id, &points).await?;

    document::mark_embedded(&state.db, &document.id, kind, points.len()).await?;

    info!(
        document_id = %document.id,
        store = %kind,
        chunks = points.len(),
        "Document embedded"
    );
    influx::track(
        state.influx.as_ref(),
        &user.id,
        influx::DOCUMENT_EMBEDDED_MEASUREMENT,
    )
    .await;

    Ok(Json(Response {
        document_id: document.id,
        vector_store: kind,
        chunks: points.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colab::{Payload, PointResult};
    use std::sync::Mutex;

    struct Recorder {
        kind: StoreKind,
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new(kind: StoreKind) -> Self {
            Self {
                kind,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl VectorStore for Recorder {
        fn kind(&self) -> StoreKind {
            self.kind
        }

        async fn upsert(&self, points: &[PointStruct]) -> anyhow::Result<()> {
            self.record(format!("upsert {}", points.len()));
            Ok(())
        }

        async fn similarity_search(
            &self,
            _: Vec<f32>,
            _: usize,
            _: &[String],
        ) -> anyhow::Result<Vec<PointResult>> {
            Ok(Vec::new())
        }

        async fn delete_document(&self, document_id: &str) -> anyhow::Result<()> {
            self.record(format!("delete {document_id}"));
            Ok(())
        }

        async fn replace_document(
            &self,
            document_id: &str,
            points: &[PointStruct],
        ) -> anyhow::Result<()> {
            self.record(format!("replace {document_id} {}", points.len()));
            Ok(())
        }
    }

    fn points() -> Vec<PointStruct> {
        vec![PointStruct {
            id: "p1".to_string(),
            vector: vec![0.1, 0.2],
            payload: Payload {
                document_id: "doc_1".to_string(),
                document_name: "notes.txt".to_string(),
                title: None,
                text: "hello".to_string(),
                chunk_index: 0,
            },
        }]
    }

    #[tokio::test]
    async fn replaces_in_place_when_the_store_is_unchanged() {
        let store = Recorder::new(StoreKind::Supabase);

        replace_vectors(Some(&store as &dyn VectorStore), &store, "doc_1", &points())
            .await
            .unwrap();

        assert_eq!(store.calls(), vec!["replace doc_1 1"]);
    }

    #[tokio::test]
    async fn clears_the_previous_store_when_moving() {
        let previous = Recorder::new(StoreKind::Supabase);
        let target = Recorder::new(StoreKind::Pinecone);

        replace_vectors(Some(&previous as &dyn VectorStore), &target, "doc_1", &points())
            .await
            .unwrap();

        assert_eq!(previous.calls(), vec!["delete doc_1"]);
        assert_eq!(target.calls(), vec!["replace doc_1 1"]);
    }
}
