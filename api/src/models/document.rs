use chrono::{DateTime, Utc};
use colab::StoreKind;
use schemars::JsonSchema;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub content: String,
    pub content_type: String,
    pub vector_store: Option<String>,
    pub chunk_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Data {
    /// Where the document's vectors live, if it has been embedded.
    pub fn vector_store(&self) -> Option<StoreKind> {
        self.vector_store.as_deref().and_then(|s| s.parse().ok())
    }
}

pub async fn list_for_user(db: &PgPool, user_id: &str) -> sqlx::Result<Vec<Data>> {
    sqlx::query_as::<_, Data>(
        "SELECT * FROM documents WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_for_user(db: &PgPool, id: &str, user_id: &str) -> sqlx::Result<Option<Data>> {
    sqlx::query_as::<_, Data>("SELECT * FROM documents WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
}

/// Counts how many of `ids` belong to the user.
pub async fn count_owned(db: &PgPool, user_id: &str, ids: &[String]) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM documents WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(user_id)
    .bind(ids)
    .fetch_one(db)
    .await
}

pub async fn create(
    db: &PgPool,
    id: &str,
    user_id: &str,
    name: &str,
    content: &str,
    content_type: &str,
) -> sqlx::Result<Data> {
    sqlx::query_as::<_, Data>(
        "INSERT INTO documents (id, user_id, name, content, content_type)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(name)
    .bind(content)
    .bind(content_type)
    .fetch_one(db)
    .await
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub async fn mark_embedded(
    db: &PgPool,
    id: &str,
    store: StoreKind,
    chunk_count: usize,
) -> sqlx::Result<Data> {
    sqlx::query_as::<_, Data>(
        "UPDATE documents SET vector_store = $2, chunk_count = $3, updated_at = now()
        WHERE id = $1
        RETURNING *",
    )
    .bind(id)
    .bind(store.as_str())
    .bind(chunk_count as i32)
    .fetch_one(db)
    .await
}

/// Forgets where the document's vectors are, before they are replaced.
pub async fn mark_unembedded(db: &PgPool, id: &str) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE documents SET vector_store = NULL, chunk_count = 0, updated_at = now()
        WHERE id = $1",
    )
    .bind(id)
    .execute(db)
    .await?;

    Ok(())
}

/// Deletes the document and drops it from every agent and chat of its owner.
pub async fn delete(db: &PgPool, id: &str, user_id: &str) -> sqlx::Result<()> {
    let mut tx = db.begin().await?;

    for table in ["agents", "chats"] {
        sqlx::query(&format!(
            "UPDATE {table} SET document_ids = array_remove(document_ids, $1)
            WHERE user_id = $2 AND $1 = ANY(document_ids)"
        ))
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}
