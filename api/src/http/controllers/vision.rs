use axum::extract::State;
use axum_jsonschema::Json;
use colab::ImageDetail;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    axum::{errors::ApiResult, extractors::User, state::AppState},
    utils::influx,
};

const DEFAULT_PROMPT: &str = "What's in this image?";

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[validate(url)]
    image_url: String,
    prompt: Option<String>,
    #[serde(default)]
    detail: ImageDetail,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Response {
    content: String,
}

pub async fn store(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<Response>> {
    req.validate()?;

    let prompt = req
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(DEFAULT_PROMPT);

    let content = state
        .openai
        .vision(prompt, &req.image_url, req.detail)
        .await?;

    influx::track(state.influx.as_ref(), &user.id, influx::VISION_MEASUREMENT).await;

    Ok(Json(Response { content }))
}
