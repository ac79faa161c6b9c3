use axum::{routing::get, Router};

use crate::{axum::state::AppState, http::controllers::ChatController};

pub fn mount() -> Router<AppState> {
    Router::new().nest(
        "/chats",
        Router::new()
            .route("/", get(ChatController::index).post(ChatController::store))
            .route(
                "/:chat",
                get(ChatController::show)
                    .put(ChatController::update)
                    .delete(ChatController::delete),
            ),
    )
}
