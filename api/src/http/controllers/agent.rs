use axum::extract::State;
use axum_jsonschema::Json;
use colab::{ModelType, StoreKind};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use super::{default_temperature, owned_documents};
use crate::{
    axum::{
        errors::ApiResult,
        extractors::{Agent, User},
        state::{AppState, State as AppStateInner},
    },
    models::agent,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[validate(length(min = 1, max = 100))]
    name: String,
    description: Option<String>,
    #[validate(length(min = 1))]
    prompt: String,
    #[serde(default)]
    model: ModelType,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    temperature: f32,
    #[serde(default)]
    document_ids: Vec<String>,
    #[serde(default)]
    vector_store: StoreKind,
}

impl Request {
    async fn into_params(self, state: &AppStateInner, user_id: &str) -> ApiResult<agent::Params> {
        self.validate()?;

        Ok(agent::Params {
            document_ids: owned_documents(state, user_id, self.document_ids).await?,
            name: self.name,
            description: self.description,
            prompt: self.prompt,
            model: self.model,
            temperature: self.temperature,
            vector_store: self.vector_store,
        })
    }
}

// List the current user's agents
pub async fn index(
    User(user): User,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<agent::Data>>> {
    Ok(Json(agent::list_for_user(&state.db, &user.id).await?))
}

#[allow(clippy::unused_async)]
pub async fn show(Agent(agent, _): Agent) -> Json<agent::Data> {
    Json(agent)
}

pub async fn store(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<agent::Data>> {
    let params = req.into_params(&state, &user.id).await?;
    let id = state.generate_id("agent")?;

    Ok(Json(agent::create(&state.db, &id, &user.id, &params).await?))
}

pub async fn update(
    Agent(agent, user): Agent,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<agent::Data>> {
    let params = req.into_params(&state, &user.id).await?;

    Ok(Json(agent::update(&state.db, &agent.id, &params).await?))
}

// Chats started from the agent keep their copy of its settings
pub async fn delete(Agent(agent, _): Agent, State(state): State<AppState>) -> ApiResult<()> {
    agent::delete(&state.db, &agent.id).await?;

    Ok(())
}
