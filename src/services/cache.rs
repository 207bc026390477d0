use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

/// Prepended to every key; the Redis instance is shared with the forum
/// application.
const KEY_NAMESPACE: &str = "moderation";

/// Best-effort JSON cache. Every Redis failure degrades to a cache miss.
#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
}

impl CacheService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(namespaced(key)).await.ok()?;
        match serde_json::from_str(&raw?) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Discarding undecodable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = self.redis.clone();
        let result: redis::RedisResult<()> = conn.set_ex(namespaced(key), json, ttl_secs).await;
        if let Err(e) = result {
            tracing::debug!("Cache write for '{}' failed: {}", key, e);
        }
    }

    pub async fn invalidate(&self, keys: &[&str]) {
        if keys.is_empty() {
            return;
        }
        let full: Vec<String> = keys.iter().map(|k| namespaced(k)).collect();
        let mut conn = self.redis.clone();
        let result: redis::RedisResult<()> = conn.del(full).await;
        if let Err(e) = result {
            tracing::debug!("Cache invalidation for {:?} failed: {}", keys, e);
        }
    }
}

fn namespaced(key: &str) -> String {
    format!("{KEY_NAMESPACE}:{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(namespaced("forums:list"), "moderation:forums:list");
    }
}
