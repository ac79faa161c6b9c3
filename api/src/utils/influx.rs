use anyhow::{Context, Result};
use futures::stream;
use influxdb2::{models::DataPoint, Client};
use std::env;
use tracing::warn;

pub const CHAT_COMPLETION_MEASUREMENT: &str = "chat_completion";
pub const DOCUMENT_EMBEDDED_MEASUREMENT: &str = "document_embedded";
pub const SPEECH_MEASUREMENT: &str = "speech";
pub const VISION_MEASUREMENT: &str = "vision";

/// Reads `INFLUX_URL`, `INFLUX_ORG` and `INFLUX_TOKEN`. Usage tracking is off
/// when any of them is missing.
pub fn from_env() -> Option<Client> {
    let url = env::var("INFLUX_URL").ok()?;
    let org = env::var("INFLUX_ORG").ok()?;
    let token = env::var("INFLUX_TOKEN").ok()?;

    Some(Client::new(url, org, token))
}

/// Records a usage event. Failures are logged and otherwise ignored.
pub async fn track(client: Option<&Client>, user_id: &str, event: &str) {
    let Some(client) = client else {
        return;
    };

    if let Err(err) = track_event(client, user_id, event).await {
        warn!("Failed to track {event} for {user_id}: {err}");
    }
}

async fn track_event(client: &Client, user_id: &str, event: &str) -> Result<()> {
    let bucket = env::var("INFLUX_DB").context("INFLUX_DB not set")?;

    let point = DataPoint::builder(event)
        .tag("user_id", user_id)
        .field("value", 1)
        .build()?;

    Ok(client
        .write(&bucket, stream::once(async { point }))
        .await?)
}
