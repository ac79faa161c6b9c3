use axum::{routing::post, Router};

use crate::{
    axum::state::AppState,
    http::controllers::{
        ChunkController, CompletionController, EmbeddingController, TtsController,
        VisionController,
    },
};

pub fn mount() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .route("/chat", post(CompletionController::chat))
            .nest(
                "/completions",
                Router::new()
                    .route("/openai", post(CompletionController::openai))
                    .route("/documents", post(CompletionController::documents))
                    .route("/agent", post(CompletionController::agent)),
            )
            .route("/embeddings/:store", post(EmbeddingController::store))
            .route("/chunk", post(ChunkController::store))
            .route("/tts", post(TtsController::store))
            .route("/vision", post(VisionController::store)),
    )
}
