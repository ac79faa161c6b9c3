use indoc::formatdoc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::Payload;

/// Number of past messages sent along with a new question.
pub const MAX_HISTORY: usize = 10;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer as concisely as possible while remaining accurate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[must_use]
pub fn build_system_prompt(prompt: Option<&str>, sources: &[Payload]) -> String {
    let prompt = prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    if sources.is_empty() {
        return prompt.to_string();
    }

    let context = sources
        .iter()
        .enumerate()
        .map(|(i, source)| match &source.title {
            Some(title) => format!("[{}] {} ({title})\n{}", i + 1, source.document_name, source.text),
            None => format!("[{}] {}\n{}", i + 1, source.document_name, source.text),
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    formatdoc!(
        "{prompt}
        Use the following pieces of context to answer the user's question.
        If you don't know the answer, just say that you don't know, don't try to make up an answer.
        ----------------
        {context}",
        prompt = prompt,
        context = context,
    )
}

/// Builds the message list for a completion: the system prompt, the most
/// recent history (system messages from the client are dropped) and the
/// new question.
#[must_use]
pub fn build_messages(
    system_prompt: String,
    history: &[ChatMessage],
    question: &str,
) -> Vec<ChatMessage> {
    let history = history
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .collect::<Vec<_>>();
    let recent = &history[history.len().saturating_sub(MAX_HISTORY)..];

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(recent.iter().map(|m| (*m).clone()));
    messages.push(ChatMessage::user(question));

    messages
}

#[must_use]
pub fn build_condense_prompt(history: &[ChatMessage], question: &str) -> String {
    let chat_history = history[history.len().saturating_sub(MAX_HISTORY)..]
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::User => Some(format!("Human: {}", m.content)),
            MessageRole::Assistant => Some(format!("Assistant: {}", m.content)),
            MessageRole::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    formatdoc!(
        "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question.

        Chat History:
        {chat_history}
        Follow Up Input: {question}
        Standalone question:",
        chat_history = chat_history,
        question = question,
    )
}
