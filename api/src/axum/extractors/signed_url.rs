use anyhow::Result;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use qstring::QString;
use std::collections::HashMap;

use crate::{
    axum::errors::ApiError,
    utils::crypto::{app_key, hmac_sha256, verify_hmac_sha256},
};

const EXPIRES_PARAM: &str = "expires";
const SIGNATURE_PARAM: &str = "signature";

/// Guards routes that can only be reached through a link built with [`build`].
#[derive(Debug)]
pub struct SignedUrl;

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SignedUrl {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path();
        let query = parts.uri.query().ok_or(ApiError::InvalidSignature)?;

        let (signature_parts, other_parts): (Vec<_>, Vec<_>) = QString::from(query)
            .into_pairs()
            .into_iter()
            .partition(|(k, _)| k == SIGNATURE_PARAM);

        let (_, signature) = signature_parts
            .into_iter()
            .next()
            .ok_or(ApiError::InvalidSignature)?;

        let query = QString::new(other_parts);
        let unsigned_url = format!("{path}{}", stringify_query(&query));

        if !verify_hmac_sha256(app_key()?.as_bytes(), &unsigned_url, &signature) {
            return Err(ApiError::InvalidSignature);
        }

        if let Some(expires) = query.get(EXPIRES_PARAM) {
            let expires = expires
                .parse::<i64>()
                .map_err(|_| ApiError::InvalidSignature)?;

            if expires < Utc::now().timestamp() {
                return Err(ApiError::SignatureExpired);
            }
        }

        Ok(Self)
    }
}

/// Builds a signed path with its query. When `expires_in` is set the link
/// stops working after that long.
pub fn build(
    path: &str,
    query: HashMap<&str, &str>,
    expires_in: Option<Duration>,
) -> Result<String> {
    let expires = expires_in.map(|ttl| (Utc::now() + ttl).timestamp().to_string());

    let mut query: Vec<(&str, &str)> = query.into_iter().collect();
    if let Some(expires) = &expires {
        query.push((EXPIRES_PARAM, expires));
    }
    query.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));

    let mut query = QString::new(query);

    let signature = hmac_sha256(
        app_key()?.as_bytes(),
        &format!("{path}{}", stringify_query(&query)),
    )?;
    query.add_pair((SIGNATURE_PARAM, &signature));

    Ok(format!("{path}{}", stringify_query(&query)))
}

fn stringify_query(query: &QString) -> String {
    if query.is_empty() {
        String::new()
    } else {
        format!("?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;
    use http::Request;
    use map_macro::map;
    use std::env;

    fn request(uri: &str) -> Request<()> {
        env::set_var("APP_KEY", "hunter2");

        Request::builder()
            .uri(format!("https://api.colab.test{uri}"))
            .body(())
            .unwrap()
    }

    fn login_link(expires_in: Option<Duration>) -> String {
        env::set_var("APP_KEY", "hunter2");

        build(
            "/auth/login",
            map! {"email" => "ada@example.com"},
            expires_in,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn validates_signed_url() {
        let req = request(&login_link(Some(Duration::days(1))));

        SignedUrl::from_request(req, &()).await.unwrap();
    }

    #[tokio::test]
    async fn throws_unauthorized_error_on_invalid_signature() {
        let req = request(&login_link(None).replace("email=ada", "email=eve"));
        let err = SignedUrl::from_request(req, &()).await.unwrap_err();

        assert_eq!(err, ApiError::InvalidSignature);
    }

    #[tokio::test]
    async fn throws_unauthorized_error_on_missing_signature() {
        let req = request("/auth/login?email=ada@example.com");
        let err = SignedUrl::from_request(req, &()).await.unwrap_err();

        assert_eq!(err, ApiError::InvalidSignature);
    }

    #[tokio::test]
    async fn rejects_expired_links() {
        let req = request(&login_link(Some(Duration::seconds(-10))));
        let err = SignedUrl::from_request(req, &()).await.unwrap_err();

        assert_eq!(err, ApiError::SignatureExpired);
        assert_eq!(err.to_string(), "This link has expired.");
    }

    #[tokio::test]
    async fn rejects_extended_expiry() {
        let link = login_link(Some(Duration::seconds(-10)));
        let later = (Utc::now() + Duration::days(1)).timestamp().to_string();
        let tampered = link
            .split('&')
            .map(|part| {
                if part.starts_with(EXPIRES_PARAM) {
                    format!("{EXPIRES_PARAM}={later}")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("&");

        let err = SignedUrl::from_request(request(&tampered), &())
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::InvalidSignature);
    }

    #[tokio::test]
    async fn works_without_extra_query_params() {
        env::set_var("APP_KEY", "hunter2");
        let req = request(&build("/test", map! {}, None).unwrap());

        SignedUrl::from_request(req, &()).await.unwrap();
    }
}
