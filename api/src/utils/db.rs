use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};
use tracing::info;

pub async fn new() -> Result<PgPool> {
    let url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await
        .context("Failed to connect to the database")?;

    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to migrate database")?;

    info!("Database migrated");

    Ok(())
}
