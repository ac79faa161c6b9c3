use anyhow::Result;
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    types::Json,
    FromRow, PgConnection, Postgres, QueryBuilder,
};
use tracing::debug;

use super::{Payload, PointResult, PointStruct, StoreKind, VectorStore};

const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Debug, FromRow)]
struct Match {
    id: String,
    metadata: Json<Payload>,
    similarity: f64,
}

/// Vectors kept in the `embeddings` table of the application database,
/// searched with pgvector's cosine distance.
#[derive(Debug, Clone)]
pub struct Supabase {
    pool: PgPool,
}

async fn insert_points(conn: &mut PgConnection, points: &[PointStruct]) -> Result<()> {
    for chunk in points.chunks(UPSERT_BATCH_SIZE) {
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO embeddings (id, document_id, content, metadata, embedding) ",
        );

        query.push_values(chunk, |mut row, point| {
            row.push_bind(&point.id)
                .push_bind(&point.payload.document_id)
                .push_bind(&point.payload.text)
                .push_bind(Json(&point.payload))
                .push_bind(Vector::from(point.vector.clone()));
        });

        query.push(
            " ON CONFLICT (id) DO UPDATE SET document_id = EXCLUDED.document_id, \
             content = EXCLUDED.content, metadata = EXCLUDED.metadata, \
             embedding = EXCLUDED.embedding",
        );

        query.build().execute(&mut *conn).await?;
    }

    Ok(())
}

impl Supabase {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a small pool of its own, for callers that don't share one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database can't be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(2).connect(url).await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl VectorStore for Supabase {
    fn kind(&self) -> StoreKind {
        StoreKind::Supabase
    }

    async fn upsert(&self, points: &[PointStruct]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_points(&mut tx, points).await?;
        tx.commit().await?;

        debug!("Upserted {} vectors", points.len());

        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    async fn similarity_search(
        &self,
        vector: Vec<f32>,
        count: usize,
        documents: &[String],
    ) -> Result<Vec<PointResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let matches = sqlx::query_as::<_, Match>(
            "SELECT id, metadata, 1 - (embedding <=> $1) AS similarity
            FROM embeddings
            WHERE document_id = ANY($2)
            ORDER BY embedding <=> $1
            LIMIT $3",
        )
        .bind(Vector::from(vector))
        .bind(documents)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches
            .into_iter()
            .map(|m| PointResult {
                id: m.id,
                score: m.similarity as f32,
                payload: m.metadata.0,
            })
            .collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM embeddings WHERE document_id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!("Deleted {deleted} vectors for {document_id}");

        Ok(())
    }

    async fn replace_document(&self, document_id: &str, points: &[PointStruct]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM embeddings WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        insert_points(&mut tx, points).await?;

        tx.commit().await?;

        debug!("Replaced vectors for {document_id} with {}", points.len());

        Ok(())
    }
}
