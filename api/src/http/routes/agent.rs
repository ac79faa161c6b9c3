use axum::{routing::get, Router};

use crate::{axum::state::AppState, http::controllers::AgentController};

pub fn mount() -> Router<AppState> {
    Router::new().nest(
        "/agents",
        Router::new()
            .route("/", get(AgentController::index).post(AgentController::store))
            .route(
                "/:agent",
                get(AgentController::show)
                    .put(AgentController::update)
                    .delete(AgentController::delete),
            ),
    )
}
