use axum::{routing::get, Router};

use crate::{axum::state::AppState, http::controllers::AuthController};

pub fn mount() -> Router<AppState> {
    Router::new().route(
        "/",
        get(AuthController::magic_login)
            .post(AuthController::request_link)
            .delete(AuthController::logout),
    )
}
