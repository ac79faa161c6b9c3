use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::env;

type HmacSha256 = Hmac<Sha256>;

pub fn app_key() -> Result<String> {
    env::var("APP_KEY").context("APP_KEY not found")
}

pub fn hmac_sha256<T: AsRef<[u8]>>(key: &[u8], data: &T) -> Result<String> {
    Ok(hex::encode(
        HmacSha256::new_from_slice(key)?
            .chain_update(data)
            .finalize()
            .into_bytes(),
    ))
}

/// Checks a hex signature in constant time.
pub fn verify_hmac_sha256<T: AsRef<[u8]>>(key: &[u8], data: &T, signature: &str) -> bool {
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };

    HmacSha256::new_from_slice(key)
        .map(|mac| mac.chain_update(data).verify_slice(&signature).is_ok())
        .unwrap_or(false)
}
