use chrono::{DateTime, Utc};
use colab::{ChatMessage, ModelType, StoreKind};
use schemars::JsonSchema;
use serde::Serialize;
use sqlx::{types::Json, FromRow, PgPool};

#[derive(Debug, FromRow)]
struct Row {
    id: String,
    user_id: String,
    agent_id: Option<String>,
    title: Option<String>,
    model: String,
    temperature: f32,
    document_ids: Vec<String>,
    vector_store: String,
    messages: Json<Vec<ChatMessage>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    pub user_id: String,
    pub agent_id: Option<String>,
    pub title: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub document_ids: Vec<String>,
    pub vector_store: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Row> for Data {
    fn from(row: Row) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            agent_id: row.agent_id,
            title: row.title,
            model: row.model,
            temperature: row.temperature,
            document_ids: row.document_ids,
            vector_store: row.vector_store,
            messages: row.messages.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
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
    pub agent_id: Option<String>,
    pub title: Option<String>,
    pub model: ModelType,
    pub temperature: f32,
    pub document_ids: Vec<String>,
    pub vector_store: StoreKind,
}

pub async fn list_for_user(db: &PgPool, user_id: &str) -> sqlx::Result<Vec<Data>> {
    let rows = sqlx::query_as::<_, Row>(
        "SELECT * FROM chats WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Data::from).collect())
}

pub async fn find_for_user(db: &PgPool, id: &str, user_id: &str) -> sqlx::Result<Option<Data>> {
    let row = sqlx::query_as::<_, Row>("SELECT * FROM chats WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(row.map(Data::from))
}

pub async fn create(db: &PgPool, id: &str, user_id: &str, params: &Params) -> sqlx::Result<Data> {
    let row = sqlx::query_as::<_, Row>(
        "INSERT INTO chats
            (id, user_id, agent_id, title, model, temperature, document_ids, vector_store)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(&params.agent_id)
    .bind(&params.title)
    .bind(params.model.as_str())
    .bind(params.temperature)
    .bind(&params.document_ids)
    .bind(params.vector_store.as_str())
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

pub async fn update(db: &PgPool, id: &str, params: &Params) -> sqlx::Result<Data> {
    let row = sqlx::query_as::<_, Row>(
        "UPDATE chats SET
            agent_id = $2, title = $3, model = $4, temperature = $5,
            document_ids = $6, vector_store = $7, updated_at = now()
        WHERE id = $1
        RETURNING *",
    )
    .bind(id)
    .bind(&params.agent_id)
    .bind(&params.title)
    .bind(params.model.as_str())
    .bind(params.temperature)
    .bind(&params.document_ids)
    .bind(params.vector_store.as_str())
    .fetch_one(db)
    .await?;

    Ok(row.into())
}

/// Appends messages to the transcript, setting the title if the chat has none.
pub async fn append_messages(
    db: &PgPool,
    id: &str,
    messages: &[ChatMessage],
    title: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE chats SET
            messages = messages || $2,
            title = COALESCE(title, $3),
            updated_at = now()
        WHERE id = $1",
    )
    .bind(id)
    .bind(Json(messages))
    .bind(title)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete(db: &PgPool, id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}
