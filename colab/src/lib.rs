#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod langchain;
pub mod openai;
mod parser;
pub mod store;
pub mod stream;

pub use langchain::{
    build_condense_prompt, build_messages, build_system_prompt, ChatMessage, MessageRole,
    DEFAULT_SYSTEM_PROMPT, MAX_HISTORY,
};
pub use openai::{ImageDetail, ModelType, OpenAI, Voice};
pub use parser::{parse_document, Chunk, ChunkOptions, Document, DocumentKind};
pub use store::{Payload, Pinecone, PointResult, PointStruct, StoreKind, Supabase, VectorStore};

use anyhow::Result;

/// Searches a set of documents for the chunks closest to `query`.
///
/// # Errors
///
/// Returns an error if the embeddings API or the vector store fails.
pub async fn search_documents(
    client: &OpenAI,
    store: &dyn VectorStore,
    documents: &[String],
    query: &str,
    count: usize,
) -> Result<Vec<PointResult>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let query_points = client.raw_embed(query).await?;
    store.similarity_search(query_points, count, documents).await
}
