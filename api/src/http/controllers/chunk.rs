use axum_jsonschema::Json;
use colab::{parse_document, Chunk, ChunkOptions, DocumentKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::axum::errors::{ApiError, ApiResult};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[validate(length(min = 1))]
    text: String,
    name: Option<String>,
    content_type: Option<String>,
    #[validate(range(min = 1))]
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Response {
    title: String,
    chunks: Vec<Chunk>,
}

#[allow(clippy::unused_async)]
pub async fn store(Json(req): Json<Request>) -> ApiResult<Json<Response>> {
    req.validate()?;

    let defaults = ChunkOptions::default();
    let options = ChunkOptions {
        chunk_size: req.chunk_size.unwrap_or(defaults.chunk_size),
        chunk_overlap: req.chunk_overlap.unwrap_or(defaults.chunk_overlap),
    };

    let name = req.name.as_deref().unwrap_or("document");
    let kind = DocumentKind::detect(name, req.content_type.as_deref());

    let document = parse_document(
        name,
        &req.text,
        kind,
        options,
    )
    .map_err(|err| ApiError::ClientError(err.to_string()))?;

    Ok(Json(Response {
        title: document.title,
        chunks: document.chunks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, content_type: Option<&str>, size: Option<usize>) -> Request {
        Request {
            text: text.to_string(),
            name: None,
            content_type: content_type.map(str::to_string),
            chunk_size: size,
            chunk_overlap: size.map(|size| size / 4),
        }
    }

    #[tokio::test]
    async fn chunks_markdown() {
        let Json(response) = store(Json(request(
            "# Intro\n\nHello there.\n\n## Usage\n\nCall it.",
            Some("text/markdown"),
            None,
        )))
        .await
        .unwrap();

        assert_eq!(response.title, "Intro");
        assert_eq!(response.chunks.len(), 2);
        assert_eq!(response.chunks[1].title.as_deref(), Some("Intro: Usage"));
        assert_eq!(response.chunks[1].index, 1);
    }

    #[tokio::test]
    async fn detects_markdown_from_the_name() {
        let mut req = request("# Intro\n\nHello.\n\n## Usage\n\nCall it.", None, None);
        req.name = Some("guide.md".to_string());

        let Json(response) = store(Json(req)).await.unwrap();

        assert_eq!(response.title, "Intro");
        assert_eq!(response.chunks[1].title.as_deref(), Some("Intro: Usage"));
    }

    #[tokio::test]
    async fn chunks_plain_text_by_size() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(50);
        let Json(response) = store(Json(request(&text, None, Some(100))))
            .await
            .unwrap();

        assert!(response.chunks.len() > 1);
        assert!(response
            .chunks
            .iter()
            .all(|chunk| chunk.content.chars().count() <= 100));
    }

    #[tokio::test]
    async fn rejects_overlapping_options() {
        let mut req = request("Hello", None, Some(10));
        req.chunk_overlap = Some(10);

        let Err(err) = store(Json(req)).await else {
            panic!("overlapping options were accepted");
        };

        assert_eq!(
            err,
            ApiError::ClientError("Chunk overlap must be smaller than chunk size".into())
        );
    }
}
