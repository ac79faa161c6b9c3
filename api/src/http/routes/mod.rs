use axum::{routing::get, Json, Router};
use serde_json::json;
use std::env;

mod agent;
mod api;
mod auth;
mod chat;
mod document;

use crate::axum::state::AppState;

pub fn mount() -> Router<AppState> {
    Router::new()
        .merge(auth::mount())
        .merge(agent::mount())
        .merge(chat::mount())
        .merge(document::mount())
        .merge(api::mount())
        .route("/version", get(version))
        .route("/", get(|| async { Json(json!({ "status": "ok" })) }))
}

#[derive(serde::Serialize)]
struct ColabVersion {
    semver: String,
    rev: Option<String>,
    compile_time: String,
}

#[allow(clippy::unused_async)]
async fn version() -> Json<ColabVersion> {
    Json(ColabVersion {
        rev: env::var("GIT_REV").ok(),
        semver: env!("CARGO_PKG_VERSION").to_string(),
        compile_time: env!("STATIC_BUILD_DATE").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_session::CookieStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use axum_sessions::SessionLayer;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::axum::state;

    fn app() -> Router {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/colab_test")
            .unwrap();

        mount()
            .layer(SessionLayer::new(CookieStore {}, &[7; 64]))
            .with_state(state::create(db))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();

        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn reports_the_version() {
        let (status, body) = send(Request::get("/version").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["semver"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn chunks_text_without_a_session() {
        let (status, body) = send(post_json(
            "/api/chunk",
            &json!({
                "text": "# Notes\n\nFirst.\n\n## More\n\nSecond.",
                "contentType": "text/markdown",
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Notes");
        assert_eq!(body["chunks"][1]["title"], "Notes: More");
    }

    #[tokio::test]
    async fn rejects_malformed_chunk_requests() {
        let (status, _) = send(post_json("/api/chunk", &json!({ "chunkSize": 10 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn requires_a_session_for_user_data() {
        for uri in ["/agents", "/chats", "/documents", "/auth/user"] {
            let (status, _) = send(Request::get(uri).body(Body::empty()).unwrap()).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }

        let (status, _) = send(post_json(
            "/api/completions/openai",
            &json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
        ))
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
