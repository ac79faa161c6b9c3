use axum::extract::State;
use axum_jsonschema::Json;
use colab::DocumentKind;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::{
    axum::{
        errors::ApiResult,
        extractors::{Document, User},
        state::AppState,
    },
    models::document,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(length(min = 1))]
    content: String,
    content_type: Option<String>,
}

pub async fn index(
    User(user): User,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<document::Data>>> {
    Ok(Json(document::list_for_user(&state.db, &user.id).await?))
}

#[allow(clippy::unused_async)]
pub async fn show(Document(document, _): Document) -> Json<document::Data> {
    Json(document)
}

pub async fn store(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<document::Data>> {
    req.validate()?;

    let kind = DocumentKind::detect(&req.name, req.content_type.as_deref());

    let id = state.generate_id("doc")?;
    let document = document::create(
        &state.db,
        &id,
        &user.id,
        &req.name,
        &req.content,
        kind.content_type(),
    )
    .await?;

    Ok(Json(document))
}

// Removes the document's vectors before the document itself
pub async fn delete(
    Document(document, user): Document,
    State(state): State<AppState>,
) -> ApiResult<()> {
    if let Some(kind) = document.vector_store() {
        state.store(kind)?.delete_document(&document.id).await?;
        info!(document_id = %document.id, store = %kind, "Deleted document vectors");
    }

    document::delete(&state.db, &document.id, &user.id).await?;

    Ok(())
}
