use anyhow::{bail, Context, Result};
use std::env;

const DEFAULT_ACCESS_TOKEN_EXPIRY: u64 = 900;
const DEFAULT_LEEWAY: u64 = 30;

/// Access tokens are minted by the main forum application; this service only
/// verifies them, so the secret must match.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime of tokens minted locally, in seconds.
    pub access_token_expiry: u64,
    /// Clock skew tolerated against the issuing application, in seconds.
    pub leeway: u64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret =
            env::var("JWT_SECRET").context("JWT_SECRET environment variable must be set")?;

        if secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters");
        }

        Ok(Self {
            secret,
            access_token_expiry: seconds_from_env(
                "JWT_ACCESS_EXPIRATION",
                DEFAULT_ACCESS_TOKEN_EXPIRY,
            ),
            leeway: seconds_from_env("JWT_LEEWAY", DEFAULT_LEEWAY),
        })
    }
}

fn seconds_from_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
