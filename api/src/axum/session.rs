use anyhow::{Context, Result};
use async_session::CookieStore;
use axum::http::Uri;
use axum_sessions::{PersistencePolicy, SameSite, SessionLayer};
use http::Request;
use sentry::types::Uuid;
use std::{env, time::Duration};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::utils::crypto;

const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

pub fn layer() -> Result<SessionLayer<CookieStore>> {
    let app_url = env::var("APP_URL")
        .context("APP_URL not set")?
        .parse::<Uri>()
        .context("APP_URL is not a valid URL")?;

    let key = crypto::app_key()?;
    if key.len() < 64 {
        anyhow::bail!("APP_KEY must be at least 64 bytes long");
    }

    let layer = SessionLayer::new(CookieStore {}, key.as_bytes())
        .with_cookie_name("colab_session")
        .with_same_site_policy(SameSite::Lax)
        .with_persistence_policy(PersistencePolicy::ChangedOnly)
        .with_session_ttl(Some(SESSION_TTL));

    Ok(match app_url.host() {
        Some(domain) if domain != "localhost" => layer.with_cookie_domain(domain.to_string()),
        _ => layer,
    })
}

#[derive(Clone, Default)]
pub struct RequestIdMaker {}

impl MakeRequestId for RequestIdMaker {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4()
            .to_string()
            .parse()
            .ok()
            .map(RequestId::new)
    }
}
