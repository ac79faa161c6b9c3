use anyhow::anyhow;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_sessions::extractors::ReadableSession;

use crate::{
    axum::{errors::ApiError, state::AppState},
    models::user,
};

pub const SESSION_IDENTIFIER: &str = "user_id";

/// The signed-in user. Rejects with 401 when there is no valid session.
pub struct User(pub user::Data);

#[async_trait]
impl FromRequestParts<AppState> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = {
            let session = parts
                .extract::<ReadableSession>()
                .await
                .map_err(|_| anyhow!("Missing session"))?;

            session
                .get::<String>(SESSION_IDENTIFIER)
                .ok_or(ApiError::AuthenticationRequired)?
        };

        user::find(&state.db, &user_id)
            .await?
            .map(Self)
            .ok_or(ApiError::AuthenticationRequired)
    }
}
