use redis::aio::ConnectionManager;
use tokio::time::{timeout, Duration};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Connects to `REDIS_URL`. The cache is optional, so callers log the error
/// and carry on without it.
pub async fn get_redis() -> anyhow::Result<ConnectionManager> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let wait = std::env::var("REDIS_CONNECT_TIMEOUT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

    let client = redis::Client::open(redis_url)?;
    timeout(Duration::from_secs(wait), ConnectionManager::new(client))
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after {} seconds", wait))?
        .map_err(Into::into)
}
