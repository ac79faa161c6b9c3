use axum::extract::State;
use axum_jsonschema::Json;
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    axum::{errors::ApiResult, extractors::User, state::AppState},
    models::user,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[validate(length(min = 1, max = 255))]
    full_name: Option<String>,
    #[validate(url)]
    avatar_url: Option<String>,
}

impl Request {
    /// Fields left out of the request keep their current value.
    fn merge(self, user: &user::Data) -> (Option<String>, Option<String>) {
        (
            self.full_name.or_else(|| user.full_name.clone()),
            self.avatar_url.or_else(|| user.avatar_url.clone()),
        )
    }
}

#[allow(clippy::unused_async)]
pub async fn show(User(user): User) -> Json<user::Data> {
    Json(user)
}

pub async fn update(
    User(user): User,
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> ApiResult<Json<user::Data>> {
    req.validate()?;

    let (full_name, avatar_url) = req.merge(&user);
    let user = user::update(
        &state.db,
        &user.id,
        full_name.as_deref(),
        avatar_url.as_deref(),
    )
    .await?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn keeps_fields_left_out_of_the_request() {
        let user = user::Data {
            id: "user_1".to_string(),
            email: "ada@example.com".to_string(),
            full_name: Some("Ada".to_string()),
            avatar_url: Some("https://example.com/ada.png".to_string()),
            created_at: Utc::now(),
        };

        let req: Request = serde_json::from_value(serde_json::json!({
            "fullName": "Ada Lovelace"
        }))
        .unwrap();

        assert_eq!(
            req.merge(&user),
            (
                Some("Ada Lovelace".to_string()),
                Some("https://example.com/ada.png".to_string())
            )
        );
    }
}
