use colab::{OpenAI, Pinecone, StoreKind, Supabase, VectorStore};
use pika::pika::{InitOptions, Pika, PrefixRecord};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::{
    axum::errors::{ApiError, ApiResult},
    utils::influx,
};

pub struct State {
    pub db: PgPool,
    pub pika: Pika,
    pub openai: OpenAI,
    pub supabase: Arc<Supabase>,
    pub pinecone: Option<Arc<Pinecone>>,
    pub influx: Option<influxdb2::Client>,
}

#[allow(clippy::module_name_repetitions)]
pub type AppState = Arc<State>;

pub fn create(db: PgPool) -> AppState {
    let pinecone = match Pinecone::from_env() {
        Ok(pinecone) => Some(Arc::new(pinecone)),
        Err(err) => {
            info!("Pinecone disabled: {err}");
            None
        }
    };

    Arc::new(State {
        pinecone,
        pika: get_pika(),
        openai: OpenAI::new(),
        influx: influx::from_env(),
        supabase: Arc::new(Supabase::new(db.clone())),
        db,
    })
}

impl State {
    pub fn generate_id(&self, prefix: &str) -> ApiResult<String> {
        self.pika
            .clone()
            .gen(prefix)
            .map_err(|_| ApiError::ServerError(anyhow::anyhow!("Failed to generate {prefix} id.")))
    }

    pub fn store(&self, kind: StoreKind) -> ApiResult<Arc<dyn VectorStore>> {
        match kind {
            StoreKind::Supabase => Ok(self.supabase.clone() as Arc<dyn VectorStore>),
            StoreKind::Pinecone => self
                .pinecone
                .clone()
                .map(|pinecone| pinecone as Arc<dyn VectorStore>)
                .ok_or_else(|| ApiError::ClientError("Pinecone is not configured.".to_string())),
        }
    }
}

fn get_pika() -> Pika {
    let prefixes = [
        ("user", "User ID"),
        ("doc", "Document ID"),
        ("agent", "Agent ID"),
        ("chat", "Chat ID"),
    ]
    .into_iter()
    .map(|(prefix, description)| PrefixRecord {
        prefix: prefix.to_string(),
        description: Some(description.to_string()),
        secure: false,
    })
    .collect();

    Pika::new(prefixes, &InitOptions::default())
}
