use chrono::{DateTime, Utc};
use colab::{ModelType, StoreKind};
use schemars::JsonSchema;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub document_ids: Vec<String>,
    pub vector_store: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Data {
    pub fn model(&self) -> anyhow::Result<ModelType> {
        self.model.parse()
    }

    pub fn vector_store(&self) -> anyhow::Result<StoreKind> {
        self.vector_store.parse()
    }
}

#[derive(Debug)]
pub struct Params {
    pub name: String,
    pub description: Option<String>,
    pub prompt: String,
    pub model: ModelType,
    pub temperature: f32,
    pub document_ids: Vec<String>,
    pub vector_store: StoreKind,
}

pub async fn list_for_user(db: &PgPool, user_id: &str) -> sqlx::Result<Vec<Data>> {
    sqlx::query_as::<_, Data>(
        "SELECT * FROM agents WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_for_user(db: &PgPool, id: &str, user_id: &str) -> sqlx::Result<Option<Data>> {
    sqlx::query_as::<_, Data>("SELECT * FROM agents WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn create(db: &PgPool, id: &str, user_id: &str, params: &Params) -> sqlx::Result<Data> {
    sqlx::query_as::<_, Data>(
        "INSERT INTO agents
            (id, user_id, name, description, prompt, model, temperature, document_ids, vector_store)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(&params.name)
    .bind(&params.description)
    .bind(&params.prompt)
    .bind(params.model.as_str())
    .bind(params.temperature)
    .bind(&params.document_ids)
    .bind(params.vector_store.as_str())
    .fetch_one(db)
    .await
}

pub async fn update(db: &PgPool, id: &str, params: &Params) -> sqlx::Result<Data> {
    sqlx::query_as::<_, Data>(
        "UPDATE agents SET
            name = $2, description = $3, prompt = $4, model = $5, temperature = $6,
            document_ids = $7, vector_store = $8, updated_at = now()
        WHERE id = $1
        RETURNING *",
    )
    .bind(id)
    .bind(&params.name)
    .bind(&params.description)
    .bind(&params.prompt)
    .bind(params.model.as_str())
    .bind(params.temperature)
    .bind(&params.document_ids)
    .bind(params.vector_store.as_str())
    .fetch_one(db)
    .await
}

pub async fn delete(db: &PgPool, id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM agents WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}
