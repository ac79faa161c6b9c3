use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};

use crate::{
    axum::{errors::ApiError, state::AppState},
    models::{document, user},
};

use super::{path_param, User};

pub struct Document(pub document::Data, pub user::Data);

#[async_trait]
impl FromRequestParts<AppState> for Document {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let User(user) = parts.extract_with_state::<User, AppState>(state).await?;
        let id = path_param(parts, "document").await?;

        let document = document::find_for_user(&state.db, &id, &user.id)
            .await?
            .ok_or(ApiError::DocumentNotFound)?;

        Ok(Self(document, user))
    }
}
