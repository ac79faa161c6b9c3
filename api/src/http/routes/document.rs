use axum::{
    routing::{delete, get},
    Router,
};

use crate::{axum::state::AppState, http::controllers::DocumentController};

pub fn mount() -> Router<AppState> {
    Router::new().nest(
        "/documents",
        Router::new()
            .route(
                "/",
                get(DocumentController::index).post(DocumentController::store),
            )
            .route("/:document", get(DocumentController::show))
            .route("/:document", delete(DocumentController::delete)),
    )
}
