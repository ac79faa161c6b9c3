use anyhow::{anyhow, Context};
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_jsonschema::Json;
use axum_sessions::extractors::WritableSession;
use chrono::Duration;
use map_macro::map;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env};
use tracing::info;
use validator::Validate;

use crate::{
    axum::{
        errors::{ApiError, ApiResult},
        extractors::{signed_url, user::SESSION_IDENTIFIER, SignedUrl},
        state::AppState,
    },
    models::user,
    utils::email,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct MagicLoginRequest {
    #[validate(email)]
    email: String,
}

pub async fn magic_login(
    _: SignedUrl,
    mut session: WritableSession,
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Redirect> {
    let email = query
        .get("email")
        .ok_or_else(|| ApiError::ClientError("No email provided".into()))?
        .to_lowercase();

    let user = match user::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            let user = user::create(&state.db, &state.generate_id("user")?, &email).await?;
            info!(user_id = %user.id, "New user signed up");
            user
        }
    };

    session
        .insert(SESSION_IDENTIFIER, user.id)
        .map_err(|_| anyhow!("Could not insert user_id into session"))?;

    let redirect_to = env::var("DASHBOARD_URL")
        .or_else(|_| env::var("APP_URL"))
        .context("APP_URL not set")?;

    Ok(Redirect::to(&redirect_to))
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct StatusResponse {
    message: &'static str,
}

pub async fn request_link(Json(req): Json<MagicLoginRequest>) -> ApiResult<Json<StatusResponse>> {
    req.validate()?;
    let email = req.email.to_lowercase();

    let path = signed_url::build(
        "/auth/login",
        map! { "email" => email.as_str() },
        Some(Duration::days(1)),
    )?;
    let link = format!(
        "{}{path}",
        env::var("APP_URL")
            .context("APP_URL not set")?
            .trim_end_matches('/')
    );

    let message = email::from_template("magic-link", map! { "link" => link })?
        .to(email)
        .build();

    email::send(message).await?;

    Ok(Json(StatusResponse {
        message: "Email sent",
    }))
}

#[allow(clippy::unused_async)]
pub async fn logout(mut session: WritableSession) -> Json<StatusResponse> {
    session.remove(SESSION_IDENTIFIER);

    Json(StatusResponse {
        message: "Logged out",
    })
}
