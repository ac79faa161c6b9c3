use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use axum_jsonschema::Json;
use colab::Voice;
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    axum::{errors::ApiResult, extractors::User, state::AppState},
    utils::influx,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct Request {
    #[validate(length(min = 1, max = 4096))]
    input: String,
    #[serde(default)]
    voice: Voice,
}

pub async fn store(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let audio = state.openai.speech(&req.input, req.voice).await?;

    influx::track(state.influx.as_ref(), &user.id, influx::SPEECH_MEASUREMENT).await;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
