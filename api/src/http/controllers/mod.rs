use colab::{ChatMessage, MessageRole};
use validator::ValidationError;

use crate::{
    axum::{
        errors::{ApiError, ApiResult},
        state::State,
    },
    models::document as document_model,
};

pub mod agent;
pub mod auth;
pub mod chat;
pub mod chunk;
pub mod completion;
pub mod document;
pub mod embedding;
pub mod tts;
pub mod user;
pub mod vision;

pub use agent as AgentController;
pub use auth as AuthController;
pub use chat as ChatController;
pub use chunk as ChunkController;
pub use completion as CompletionController;
pub use document as DocumentController;
pub use embedding as EmbeddingController;
pub use tts as TtsController;
pub use user as UserController;
pub use vision as VisionController;

pub const fn default_temperature() -> f32 {
    0.7
}

/// Deduplicates `ids` and makes sure every one of them is a document the user owns.
pub async fn owned_documents(
    state: &State,
    user_id: &str,
    mut ids: Vec<String>,
) -> ApiResult<Vec<String>> {
    ids.sort();
    ids.dedup();

    if ids.is_empty() {
        return Ok(ids);
    }

    let owned = document_model::count_owned(&state.db, user_id, &ids).await?;
    if usize::try_from(owned).unwrap_or_default() != ids.len() {
        return Err(ApiError::DocumentNotFound);
    }

    Ok(ids)
}

/// Rejects text that is empty once whitespace is trimmed.
pub fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }

    Ok(())
}

/// Splits a transcript into its history and the final user question.
pub fn split_question(mut messages: Vec<ChatMessage>) -> ApiResult<(Vec<ChatMessage>, String)> {
    match messages.pop() {
        Some(ChatMessage {
            role: MessageRole::User,
            content,
        }) if not_blank(&content).is_ok() => Ok((messages, content)),
        _ => Err(ApiError::ClientError(
            "The last message must be a question from the user.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_the_last_question() {
        let (history, question) = split_question(vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("What is Colab?"),
        ])
        .unwrap();

        assert_eq!(question, "What is Colab?");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn requires_a_trailing_user_message() {
        assert!(split_question(vec![]).is_err());
        assert!(split_question(vec![ChatMessage::assistant("Hello!")]).is_err());
        assert!(split_question(vec![ChatMessage::user("  ")]).is_err());
    }
}
