use anyhow::{anyhow, bail, Result};
use async_openai::{
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageArgs,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, Role,
    },
    Client,
};
use backoff::ExponentialBackoffBuilder;
use futures::{future, Stream, StreamExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{env, fmt::Display, str::FromStr, sync::Arc, time::Duration};
use tracing::debug;
use uuid::Uuid;

use crate::{
    langchain::{build_condense_prompt, ChatMessage, MessageRole},
    parser::Chunk,
    store::{Payload, PointStruct},
};

pub const API_BASE: &str = "https://api.openai.com/v1";
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const SPEECH_MODEL: &str = "tts-1";
pub const MAX_SPEECH_INPUT: usize = 4096;

const EMBEDDING_BATCH_SIZE: usize = 100;
const VISION_MAX_TOKENS: u16 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ModelType {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl ModelType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4",
            Self::Gpt4Turbo => "gpt-4-turbo",
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gpt-3.5-turbo" => Ok(Self::Gpt35Turbo),
            "gpt-4" => Ok(Self::Gpt4),
            "gpt-4-turbo" => Ok(Self::Gpt4Turbo),
            "gpt-4o" => Ok(Self::Gpt4o),
            "gpt-4o-mini" => Ok(Self::Gpt4oMini),
            _ => Err(anyhow!("Unsupported model: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Auto,
    Low,
    High,
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::System => Self::System,
            MessageRole::User => Self::User,
            MessageRole::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    choices: Vec<VisionChoice>,
}

#[derive(Debug, Deserialize)]
struct VisionChoice {
    message: VisionMessage,
}

#[derive(Debug, Deserialize)]
struct VisionMessage {
    content: Option<String>,
}

/// Thin wrapper around the OpenAI APIs this application talks to.
///
/// Chat and embeddings go through `async-openai`. Speech and vision requests
/// are plain JSON calls against the same base URL.
#[derive(Clone)]
pub struct OpenAI {
    client: Arc<Client>,
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAI {
    #[must_use]
    pub fn new() -> Self {
        Self::with_credentials(env::var("OPENAI_API_KEY").unwrap_or_default(), API_BASE)
    }

    #[must_use]
    pub fn with_credentials(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let api_base = api_base.into();

        let backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        Self {
            client: Arc::new(
                Client::new()
                    .with_api_key(api_key.clone())
                    .with_api_base(api_base.clone())
                    .with_backoff(backoff),
            ),
            http: reqwest::Client::new(),
            api_base,
            api_key,
        }
    }

    /// Embeds the chunks of a document into points ready to be upserted.
    ///
    /// # Errors
    ///
    /// Returns an error if any batch sent to the Embeddings API fails.
    pub async fn embed(
        &self,
        document_id: &str,
        document_name: &str,
        chunks: &[Chunk],
    ) -> Result<Vec<PointStruct>> {
        let mut responses = Vec::new();

        for batch in chunks.chunks(EMBEDDING_BATCH_SIZE) {
            let client = self.client.clone();
            let request = CreateEmbeddingRequestArgs::default()
                .model(EMBEDDING_MODEL)
                .input(batch.iter().map(|c| c.content.clone()).collect::<Vec<_>>())
                .build()?;

            responses.push(tokio::spawn(async move {
                client.embeddings().create(request).await
            }));
        }

        let responses = future::join_all(responses).await;
        let mut points = Vec::with_capacity(chunks.len());

        for (batch, response) in chunks.chunks(EMBEDDING_BATCH_SIZE).zip(responses) {
            let mut response = response??;
            response.data.sort_by_key(|e| e.index);

            if response.data.len() != batch.len() {
                bail!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    response.data.len()
                );
            }

            for (chunk, embedding) in batch.iter().zip(response.data) {
                points.push(PointStruct {
                    id: Uuid::new_v4().to_string(),
                    vector: embedding.embedding,
                    payload: Payload::from_chunk(document_id, document_name, chunk),
                });
            }
        }

        debug!("Embedded {} chunks of {document_id}", points.len());

        Ok(points)
    }

    /// Embeds a string into a single vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the Embeddings API returns an error.
    pub async fn raw_embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(EMBEDDING_MODEL)
            .input(text)
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        Ok(response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Could not find embedding"))?
            .embedding)
    }

    /// Runs a chat completion and returns the full answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the Chat API returns an error.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        model: ModelType,
        temperature: f32,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model.as_str())
            .temperature(temperature)
            .messages(into_request_messages(messages)?)
            .build()?;

        let response = self.client.chat().create(request).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Could not find completion"))?
            .message
            .content)
    }

    /// Runs a chat completion, yielding the answer as it is generated.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream could not be opened. Errors while
    /// streaming are yielded by the stream itself.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        model: ModelType,
        temperature: f32,
    ) -> Result<impl Stream<Item = Result<String>>> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model.as_str())
            .temperature(temperature)
            .messages(into_request_messages(messages)?)
            .build()?;

        let stream = self.client.chat().create_stream(request).await?;

        Ok(stream.filter_map(|chunk| {
            future::ready(match chunk {
                Ok(response) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|delta| !delta.is_empty())
                    .map(Ok),
                Err(err) => Some(Err(err.into())),
            })
        }))
    }

    /// Rephrases a follow-up question into a standalone one, so it can be
    /// embedded without the conversation around it.
    ///
    /// # Errors
    ///
    /// Returns an error if the Chat API returns an error.
    pub async fn condense_question(
        &self,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = ChatMessage::user(build_condense_prompt(history, question));
        let condensed = self.chat(&[prompt], ModelType::Gpt35Turbo, 0.0).await?;

        Ok(condensed.trim().to_string())
    }

    /// Turns text into spoken audio (MP3).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is too long or the Audio API fails.
    pub async fn speech(&self, input: &str, voice: Voice) -> Result<Vec<u8>> {
        if input.chars().count() > MAX_SPEECH_INPUT {
            bail!("Input must be at most {MAX_SPEECH_INPUT} characters");
        }

        let audio = self
            .http
            .post(format!("{}/audio/speech", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": SPEECH_MODEL,
                "input": input,
                "voice": voice,
                "response_format": "mp3",
            }))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(audio.to_vec())
    }

    /// Asks a vision-capable model about an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the Chat API fails or returns no content.
    pub async fn vision(&self, prompt: &str, image_url: &str, detail: ImageDetail) -> Result<String> {
        let response: VisionResponse = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": ModelType::Gpt4o,
                "max_tokens": VISION_MAX_TOKENS,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        { "type": "image_url", "image_url": { "url": image_url, "detail": detail } },
                    ],
                }],
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Could not find completion"))
    }
}

impl Default for OpenAI {
    fn default() -> Self {
        Self::new()
    }
}

fn into_request_messages(messages: &[ChatMessage]) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages
        .iter()
        .map(|message| {
            ChatCompletionRequestMessageArgs::default()
                .role(Role::from(message.role))
                .content(message.content.clone())
                .build()
                .map_err(Into::into)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn parses_model_ids() {
        assert_eq!("gpt-4o".parse::<ModelType>().unwrap(), ModelType::Gpt4o);
        assert_eq!(
            "gpt-3.5-turbo".parse::<ModelType>().unwrap(),
            ModelType::Gpt35Turbo
        );

        let err = "text-davinci-003".parse::<ModelType>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported model: text-davinci-003");
    }

    #[test]
    fn model_ids_roundtrip_through_serde() {
        let model: ModelType = serde_json::from_str("\"gpt-4-turbo\"").unwrap();

        assert_eq!(model, ModelType::Gpt4Turbo);
        assert_eq!(serde_json::to_string(&model).unwrap(), "\"gpt-4-turbo\"");
        assert_eq!(model.to_string(), "gpt-4-turbo");
    }

    #[tokio::test]
    async fn requests_speech_audio() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/audio/speech")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "tts-1",
                        "input": "Hello there",
                        "voice": "nova",
                        "response_format": "mp3",
                    }));
                then.status(200)
                    .header("content-type", "audio/mpeg")
                    .body([0xFF_u8, 0xFB, 0x90]);
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let audio = client.speech("Hello there", Voice::Nova).await.unwrap();

        mock.assert_async().await;
        assert_eq!(audio, vec![0xFF, 0xFB, 0x90]);
    }

    #[tokio::test]
    async fn rejects_long_speech_input_without_calling_the_api() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/audio/speech");
                then.status(200);
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let input = "a".repeat(MAX_SPEECH_INPUT + 1);

        assert!(client.speech(&input, Voice::Alloy).await.is_err());
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn describes_images() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .json_body_partial(r#"{ "model": "gpt-4o" }"#);
                then.status(200).json_body(json!({
                    "choices": [{
                        "index": 0,
                        "message": { "role": "assistant", "content": "A cat on a sofa." },
                        "finish_reason": "stop",
                    }],
                }));
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let content = client
            .vision(
                "What is in this image?",
                "https://example.com/cat.png",
                ImageDetail::Low,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(content, "A cat on a sofa.");
    }

    #[tokio::test]
    async fn surfaces_vision_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).json_body(json!({ "error": { "message": "slow down" } }));
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let result = client
            .vision("Describe", "https://example.com/cat.png", ImageDetail::Auto)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn condensing_without_history_keeps_the_question() {
        let client = OpenAI::with_credentials("sk-test", "http://127.0.0.1:9");

        let question = client
            .condense_question(&[], "What is pgvector?")
            .await
            .unwrap();

        assert_eq!(question, "What is pgvector?");
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|index| Chunk {
                index,
                title: None,
                content: format!("chunk {index}"),
            })
            .collect()
    }

    // Embeddings are returned in reverse order, each one holding its chunk's
    // position in the document.
    fn embeddings(offset: usize, count: usize) -> serde_json::Value {
        let data = (0..count)
            .rev()
            .map(|index| {
                json!({
                    "object": "embedding",
                    "embedding": [(offset + index) as f32],
                    "index": index,
                })
            })
            .collect::<Vec<_>>();

        json!({
            "object": "list",
            "model": EMBEDDING_MODEL,
            "data": data,
            "usage": { "prompt_tokens": 1, "total_tokens": 1 },
        })
    }

    #[tokio::test]
    async fn embeds_in_batches_and_keeps_chunk_order() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .body_contains("\"chunk 0\"");
                then.status(200).json_body(embeddings(0, 100));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .body_contains("\"chunk 100\"");
                then.status(200).json_body(embeddings(100, 50));
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let points = client
            .embed("doc_1", "guide.md", &chunks(150))
            .await
            .unwrap();

        first.assert_hits_async(1).await;
        second.assert_hits_async(1).await;

        assert_eq!(points.len(), 150);
        for (index, point) in points.iter().enumerate() {
            assert_eq!(point.vector, vec![index as f32]);
            assert_eq!(point.payload.chunk_index, index);
            assert_eq!(point.payload.text, format!("chunk {index}"));
            assert_eq!(point.payload.document_id, "doc_1");
        }
    }

    #[tokio::test]
    async fn rejects_a_short_embedding_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(embeddings(0, 2));
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let err = client
            .embed("doc_1", "guide.md", &chunks(3))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Expected 3 embeddings, got 2");
    }

    #[tokio::test]
    async fn condenses_follow_up_questions() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .json_body_partial(r#"{ "model": "gpt-3.5-turbo", "temperature": 0.0 }"#);
                then.status(200).json_body(json!({
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 0,
                    "model": "gpt-3.5-turbo",
                    "choices": [{
                        "index": 0,
                        "message": { "role": "assistant", "content": " How is pgvector installed? " },
                        "finish_reason": "stop",
                    }],
                }));
            })
            .await;

        let client = OpenAI::with_credentials("sk-test", server.base_url());
        let question = client
            .condense_question(
                &[
                    ChatMessage::user("What is pgvector?"),
                    ChatMessage::assistant("A Postgres extension."),
                ],
                "How do I install it?",
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(question, "How is pgvector installed?");
    }
}
