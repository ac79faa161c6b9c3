#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use ::axum::Server;
use anyhow::Result;
use dotenvy::dotenv;
use std::{env, net::SocketAddr};
use tracing::info;

use crate::{axum::app, utils::logger};

mod axum;
mod http;
mod models;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let _guard = logger::setup();

    let app = app::create().await?;
    let address = SocketAddr::from((
        [0, 0, 0, 0],
        env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000),
    ));

    info!("⚡ Colab API started on http://{address}");
    Server::bind(&address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
