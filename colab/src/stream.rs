use async_fn_stream::try_fn_stream;
use futures::{Stream, StreamExt};
use std::sync::Arc;

use crate::{
    build_messages, build_system_prompt, search_documents, store::Payload, ChatMessage, ModelType,
    OpenAI, VectorStore,
};

/// How many chunks are retrieved for a grounded answer.
pub const DEFAULT_RETRIEVAL_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum PartialResult {
    References(Vec<Payload>),
    PartialAnswer(String),
}

pub struct Retrieval {
    pub store: Arc<dyn VectorStore>,
    pub documents: Vec<String>,
    pub count: usize,
}

impl Retrieval {
    pub fn new(store: Arc<dyn VectorStore>, documents: Vec<String>) -> Self {
        Self {
            store,
            documents,
            count: DEFAULT_RETRIEVAL_COUNT,
        }
    }
}

pub struct Conversation {
    pub prompt: Option<String>,
    pub history: Vec<ChatMessage>,
    pub question: String,
    pub model: ModelType,
    pub temperature: f32,
    pub retrieval: Option<Retrieval>,
}

/// Answers the last question of a conversation.
///
/// When the conversation is grounded, the retrieved chunks are emitted first,
/// then the answer is emitted piece by piece as the model generates it.
pub fn ask(
    client: OpenAI,
    conversation: Conversation,
) -> impl Stream<Item = Result<PartialResult, anyhow::Error>> {
    try_fn_stream(|emitter| async move {
        let Conversation {
            prompt,
            history,
            question,
            model,
            temperature,
            retrieval,
        } = conversation;

        let mut sources = Vec::new();

        if let Some(retrieval) = retrieval.filter(|r| !r.documents.is_empty()) {
            let query = client.condense_question(&history, &question).await?;
            let results = search_documents(
                &client,
                retrieval.store.as_ref(),
                &retrieval.documents,
                &query,
                retrieval.count,
            )
            .await?;

            sources = results.into_iter().map(|r| r.payload).collect();
            emitter
                .emit(PartialResult::References(sources.clone()))
                .await;
        }

        let messages = build_messages(
            build_system_prompt(prompt.as_deref(), &sources),
            &history,
            &question,
        );

        let mut answer = Box::pin(client.chat_stream(&messages, model, temperature).await?);
        while let Some(delta) = answer.next().await {
            emitter.emit(PartialResult::PartialAnswer(delta?)).await;
        }

        Ok::<(), anyhow::Error>(())
    })
}
