use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn find(db: &PgPool, id: &str) -> sqlx::Result<Option<Data>> {
    sqlx::query_as::<_, Data>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<Data>> {
    sqlx::query_as::<_, Data>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(db)
        .await
}

/// Creates the user, or returns the existing one if the email is taken.
pub async fn create(db: &PgPool, id: &str, email: &str) -> sqlx::Result<Data> {
    sqlx::query_as::<_, Data>(
        "INSERT INTO users (id, email) VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING *",
    )
    .bind(id)
    .bind(email)
    .fetch_one(db)
    .await
}

pub async fn update(
    db: &PgPool,
    id: &str,
    full_name: Option<&str>,
    avatar_url: Option<&str>,
) -> sqlx::Result<Data> {
    sqlx::query_as::<_, Data>(
        "UPDATE users SET full_name = $2, avatar_url = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(full_name)
    .bind(avatar_url)
    .fetch_one(db)
    .await
}
