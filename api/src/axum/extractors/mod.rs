use axum::{extract::Path, http::request::Parts, RequestPartsExt};
use std::collections::HashMap;

use crate::axum::errors::ApiError;

mod agent;
mod chat;
mod document;
pub mod signed_url;
pub mod user;

pub use agent::Agent;
pub use chat::Chat;
pub use document::Document;
pub use signed_url::SignedUrl;
pub use user::User;

async fn path_param(parts: &mut Parts, name: &str) -> Result<String, ApiError> {
    let Path(path) = parts
        .extract::<Path<HashMap<String, String>>>()
        .await
        .map_err(|_| ApiError::ClientError(format!("Missing {name} ID")))?;

    path.get(name)
        .cloned()
        .ok_or_else(|| ApiError::ClientError(format!("Missing {name} ID")))
}
