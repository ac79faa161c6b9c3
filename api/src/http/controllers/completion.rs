use async_fn_stream::try_fn_stream;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use axum_jsonschema::Json;
use colab::{
    stream::{ask, Conversation, PartialResult, Retrieval},
    ChatMessage, ModelType, StoreKind,
};
use futures::{Stream, StreamExt};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use validator::Validate;

use super::{default_temperature, not_blank, owned_documents, split_question};
use crate::{
    axum::{
        errors::{ApiError, ApiResult},
        extractors::User,
        sse,
        state::{AppState, State as AppStateInner},
    },
    models::{agent, chat},
    utils::influx,
};

const MAX_TITLE_LENGTH: usize = 60;

fn retrieval(
    state: &AppStateInner,
    store: StoreKind,
    documents: Vec<String>,
) -> ApiResult<Option<Retrieval>> {
    if documents.is_empty() {
        return Ok(None);
    }

    Ok(Some(Retrieval::new(state.store(store)?, documents)))
}

fn title_from(question: &str) -> String {
    let question = question.split_whitespace().collect::<Vec<_>>().join(" ");

    if question.chars().count() <= MAX_TITLE_LENGTH {
        return question;
    }

    let title = question
        .chars()
        .take(MAX_TITLE_LENGTH - 1)
        .collect::<String>();

    format!("{}…", title.trim_end())
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    chat_id: String,
    #[validate(custom = "not_blank")]
    message: String,
}

/// Answers the next message of a saved chat, then stores both the message
/// and the answer in the chat's transcript.
pub async fn chat(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    req.validate()?;

    let chat = chat::find_for_user(&state.db, &req.chat_id, &user.id)
        .await?
        .ok_or(ApiError::ChatNotFound)?;

    let agent = match &chat.agent_id {
        Some(id) => agent::find_for_user(&state.db, id, &user.id).await?,
        None => None,
    };

    let conversation = Conversation {
        prompt: agent.map(|agent| agent.prompt),
        question: req.message.clone(),
        model: chat.model()?,
        temperature: chat.temperature,
        retrieval: retrieval(&state, chat.vector_store()?, chat.document_ids.clone())?,
        history: chat.messages,
    };

    let chat_id = chat.id;
    let title = chat.title.is_none().then(|| title_from(&req.message));
    let done = json!({ "chatId": chat_id });

    let stream = try_fn_stream(|emitter| async move {
        let mut answer = String::new();
        let mut results = Box::pin(ask(state.openai.clone(), conversation));

        while let Some(result) = results.next().await {
            let result = result?;
            if let PartialResult::PartialAnswer(delta) = &result {
                answer.push_str(delta);
            }

            emitter.emit(result).await;
        }

        chat::append_messages(
            &state.db,
            &chat_id,
            &[ChatMessage::user(req.message), ChatMessage::assistant(answer)],
            title.as_deref(),
        )
        .await?;

        influx::track(
            state.influx.as_ref(),
            &user.id,
            influx::CHAT_COMPLETION_MEASUREMENT,
        )
        .await;

        Ok::<(), anyhow::Error>(())
    });

    Ok(sse::respond(stream, done))
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    #[validate(length(min = 1))]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    model: ModelType,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    temperature: f32,
    prompt: Option<String>,
}

// Plain completion, nothing is retrieved or saved
pub async fn openai(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<CompletionRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    req.validate()?;
    let (history, question) = split_question(req.messages)?;

    influx::track(
        state.influx.as_ref(),
        &user.id,
        influx::CHAT_COMPLETION_MEASUREMENT,
    )
    .await;

    let conversation = Conversation {
        history,
        question,
        prompt: req.prompt,
        model: req.model,
        temperature: req.temperature,
        retrieval: None,
    };

    Ok(sse::respond(
        ask(state.openai.clone(), conversation),
        json!({}),
    ))
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsRequest {
    #[validate(length(min = 1))]
    messages: Vec<ChatMessage>,
    #[validate(length(min = 1))]
    document_ids: Vec<String>,
    #[serde(default)]
    vector_store: StoreKind,
    #[serde(default)]
    model: ModelType,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    temperature: f32,
    prompt: Option<String>,
}

pub async fn documents(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<DocumentsRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    req.validate()?;
    let (history, question) = split_question(req.messages)?;
    let documents = owned_documents(&state, &user.id, req.document_ids).await?;

    influx::track(
        state.influx.as_ref(),
        &user.id,
        influx::CHAT_COMPLETION_MEASUREMENT,
    )
    .await;

    let conversation = Conversation {
        history,
        question,
        prompt: req.prompt,
        model: req.model,
        temperature: req.temperature,
        retrieval: retrieval(&state, req.vector_store, documents)?,
    };

    Ok(sse::respond(
        ask(state.openai.clone(), conversation),
        json!({}),
    ))
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    agent_id: String,
    #[validate(length(min = 1))]
    messages: Vec<ChatMessage>,
}

pub async fn agent(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<AgentRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    req.validate()?;

    let agent = agent::find_for_user(&state.db, &req.agent_id, &user.id)
        .await?
        .ok_or(ApiError::AgentNotFound)?;
    let (history, question) = split_question(req.messages)?;

    influx::track(
        state.influx.as_ref(),
        &user.id,
        influx::CHAT_COMPLETION_MEASUREMENT,
    )
    .await;

    let conversation = Conversation {
        history,
        question,
        model: agent.model()?,
        temperature: agent.temperature,
        retrieval: retrieval(&state, agent.vector_store()?, agent.document_ids.clone())?,
        prompt: Some(agent.prompt),
    };

    Ok(sse::respond(
        ask(state.openai.clone(), conversation),
        json!({}),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_chats_from_their_first_question() {
        assert_eq!(title_from("  How do I\n install it? "), "How do I install it?");

        let title = title_from(&"word ".repeat(40));
        assert_eq!(title.chars().count(), MAX_TITLE_LENGTH);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn rejects_blank_chat_messages() {
        let blank: ChatRequest = serde_json::from_value(json!({
            "chatId": "chat_1",
            "message": " \n\t ",
        }))
        .unwrap();
        assert!(blank.validate().is_err());

        let question: ChatRequest = serde_json::from_value(json!({
            "chatId": "chat_1",
            "message": "What is Colab?",
        }))
        .unwrap();
        assert!(question.validate().is_ok());
    }
}
