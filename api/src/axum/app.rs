use anyhow::{bail, Result};
use axum::Router;
use std::env;
use tower_http::{
    cors::{AllowCredentials, AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    axum::{
        session::{self, RequestIdMaker},
        state,
    },
    http::routes,
    utils::db,
};

const REQUIRED_ENV_VARS: &[&str] = &[
    "APP_KEY",
    "APP_URL",
    "MAIL_FROM",
    "DATABASE_URL",
    "OPENAI_API_KEY",
    "POSTMARK_TOKEN",
];

fn allowed_origins() -> Vec<String> {
    ["APP_URL", "DASHBOARD_URL"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .map(|url| url.trim_end_matches('/').to_string())
        .chain(["http://localhost:3000".to_string()])
        .collect()
}

pub async fn create() -> Result<Router> {
    for var in REQUIRED_ENV_VARS {
        if env::var(var).is_err() {
            bail!("${var} not set");
        }
    }

    let db = db::new().await?;
    db::migrate(&db).await?;

    let origins = allowed_origins();

    Ok(Router::new()
        .merge(routes::mount())
        .layer(session::layer()?)
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_methods(AllowMethods::mirror_request())
                .allow_credentials(AllowCredentials::predicate(move |origin, _| {
                    let origin = origin.to_str().unwrap_or_default();

                    origins.iter().any(|allowed| allowed == origin)
                })),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(RequestIdMaker::default()))
        .with_state(state::create(db)))
}
