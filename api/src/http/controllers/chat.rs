use axum::extract::State;
use axum_jsonschema::Json;
use colab::{ModelType, StoreKind};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use super::owned_documents;
use crate::{
    axum::{
        errors::{ApiError, ApiResult},
        extractors::{Chat, User},
        state::{AppState, State as AppStateInner},
    },
    models::{agent, chat, user},
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[validate(length(min = 1, max = 255))]
    title: Option<String>,
    agent_id: Option<String>,
    model: Option<ModelType>,
    #[validate(range(min = 0.0, max = 2.0))]
    temperature: Option<f32>,
    document_ids: Option<Vec<String>>,
    vector_store: Option<StoreKind>,
}

impl Request {
    /// Settings left out of the request are kept from the chat being updated.
    /// A newly attached agent provides the ones the request leaves out, and
    /// the defaults fill in the rest.
    async fn into_params(
        self,
        state: &AppStateInner,
        user: &user::Data,
        current: Option<&chat::Data>,
    ) -> ApiResult<chat::Params> {
        self.validate()?;

        let agent = match self.attached_agent(current) {
            Some(id) => Some(
                agent::find_for_user(&state.db, id, &user.id)
                    .await?
                    .ok_or(ApiError::AgentNotFound)?,
            ),
            None => None,
        };

        let mut params = self.resolve(agent.as_ref(), current)?;
        params.document_ids = owned_documents(state, &user.id, params.document_ids).await?;

        Ok(params)
    }

    /// The agent to read settings from: only one the chat isn't attached to yet.
    fn attached_agent(&self, current: Option<&chat::Data>) -> Option<&str> {
        let id = self.agent_id.as_deref()?;

        match current.and_then(|chat| chat.agent_id.as_deref()) {
            Some(existing) if existing == id => None,
            _ => Some(id),
        }
    }

    fn resolve(
        self,
        agent: Option<&agent::Data>,
        current: Option<&chat::Data>,
    ) -> ApiResult<chat::Params> {
        let model = match (self.model, agent, current) {
            (Some(model), _, _) => model,
            (None, Some(agent), _) => agent.model()?,
            (None, None, Some(chat)) => chat.model()?,
            (None, None, None) => ModelType::default(),
        };

        let vector_store = match (self.vector_store, agent, current) {
            (Some(store), _, _) => store,
            (None, Some(agent), _) => agent.vector_store()?,
            (None, None, Some(chat)) => chat.vector_store()?,
            (None, None, None) => StoreKind::default(),
        };

        let temperature = self
            .temperature
            .or_else(|| agent.map(|a| a.temperature))
            .or_else(|| current.map(|c| c.temperature))
            .unwrap_or_else(super::default_temperature);

        let document_ids = self
            .document_ids
            .or_else(|| agent.map(|a| a.document_ids.clone()))
            .or_else(|| current.map(|c| c.document_ids.clone()))
            .unwrap_or_default();

        Ok(chat::Params {
            model,
            vector_store,
            temperature,
            document_ids,
            title: self
                .title
                .or_else(|| current.and_then(|c| c.title.clone())),
            agent_id: self
                .agent_id
                .or_else(|| current.and_then(|c| c.agent_id.clone())),
        })
    }
}

pub async fn index(
    User(user): User,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<chat::Data>>> {
    Ok(Json(chat::list_for_user(&state.db, &user.id).await?))
}

#[allow(clippy::unused_async)]
pub async fn show(Chat(chat, _): Chat) -> Json<chat::Data> {
    Json(chat)
}

// Start a new chat, optionally from one of the user's agents
pub async fn store(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<chat::Data>> {
    let params = req.into_params(&state, &user, None).await?;
    let id = state.generate_id("chat")?;

    Ok(Json(chat::create(&state.db, &id, &user.id, &params).await?))
}

pub async fn update(
    Chat(chat, user): Chat,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<chat::Data>> {
    let params = req.into_params(&state, &user, Some(&chat)).await?;

    Ok(Json(chat::update(&state.db, &chat.id, &params).await?))
}

pub async fn delete(Chat(chat, _): Chat, State(state): State<AppState>) -> ApiResult<()> {
    chat::delete(&state.db, &chat.id).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(json: serde_json::Value) -> Request {
        serde_json::from_value(json).unwrap()
    }

    fn current_chat() -> chat::Data {
        chat::Data {
            id: "chat_1".to_string(),
            user_id: "user_1".to_string(),
            agent_id: Some("agent_1".to_string()),
            title: Some("Support".to_string()),
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            document_ids: vec!["doc_1".to_string()],
            vector_store: "pinecone".to_string(),
            messages: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn other_agent() -> agent::Data {
        agent::Data {
            id: "agent_2".to_string(),
            user_id: "user_1".to_string(),
            name: "Sales".to_string(),
            description: None,
            prompt: "Sell things.".to_string(),
            model: "gpt-4-turbo".to_string(),
            temperature: 1.0,
            document_ids: vec!["doc_2".to_string()],
            vector_store: "supabase".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn renaming_keeps_the_other_settings() {
        let current = current_chat();
        let params = request(serde_json::json!({ "title": "Renamed" }))
            .resolve(None, Some(&current))
            .unwrap();

        assert_eq!(params.title.as_deref(), Some("Renamed"));
        assert_eq!(params.agent_id.as_deref(), Some("agent_1"));
        assert_eq!(params.model, ModelType::Gpt4o);
        assert!((params.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(params.document_ids, vec!["doc_1"]);
        assert_eq!(params.vector_store, StoreKind::Pinecone);
    }

    #[test]
    fn only_a_new_agent_is_consulted() {
        let current = current_chat();

        let same = request(serde_json::json!({ "agentId": "agent_1" }));
        assert_eq!(same.attached_agent(Some(&current)), None);

        let switched = request(serde_json::json!({ "agentId": "agent_2" }));
        assert_eq!(switched.attached_agent(Some(&current)), Some("agent_2"));

        let params = switched
            .resolve(Some(&other_agent()), Some(&current))
            .unwrap();
        assert_eq!(params.agent_id.as_deref(), Some("agent_2"));
        assert_eq!(params.model, ModelType::Gpt4Turbo);
        assert_eq!(params.document_ids, vec!["doc_2"]);
        assert_eq!(params.vector_store, StoreKind::Supabase);
        assert_eq!(params.title.as_deref(), Some("Support"));
    }

    #[test]
    fn new_chats_fall_back_to_defaults() {
        let params = request(serde_json::json!({})).resolve(None, None).unwrap();

        assert_eq!(params.model, ModelType::default());
        assert_eq!(params.vector_store, StoreKind::default());
        assert!(params.document_ids.is_empty());
        assert!(params.agent_id.is_none());
    }
}
