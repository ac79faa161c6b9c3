use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};

use crate::{
    axum::{errors::ApiError, state::AppState},
    models::{chat, user},
};

use super::{path_param, User};

/// Loads the chat named in the path, if the signed-in user owns it.
pub struct Chat(pub chat::Data, pub user::Data);

#[async_trait]
impl FromRequestParts<AppState> for Chat {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let User(user) = parts.extract_with_state::<User, AppState>(state).await?;
        let id = path_param(parts, "chat").await?;

        let chat = chat::find_for_user(&state.db, &id, &user.id)
            .await?
            .ok_or(ApiError::ChatNotFound)?;

        Ok(Self(chat, user))
    }
}
