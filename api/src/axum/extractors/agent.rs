use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};

use crate::{
    axum::{errors::ApiError, state::AppState},
    models::{agent, user},
};

use super::{path_param, User};

/// An agent owned by the signed-in user, taken from the `:agent` path segment.
pub struct Agent(pub agent::Data, pub user::Data);

#[async_trait]
impl FromRequestParts<AppState> for Agent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let User(user) = parts.extract_with_state::<User, AppState>(state).await?;
        let id = path_param(parts, "agent").await?;

        let agent = agent::find_for_user(&state.db, &id, &user.id)
            .await?
            .ok_or(ApiError::AgentNotFound)?;

        Ok(Self(agent, user))
    }
}
