use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;

use crate::metrics::WindowSummary;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("redis write failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// One auto-reconnecting connection; clones share the underlying
/// multiplexed TCP connection, so every rotation can just clone it.
pub async fn connect(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(url)?;
    ConnectionManager::new(client).await
}

/// Persist one rotation's snapshot document as `stats/<unix-ms>`, expiring
/// after `retention`. Returns the key it was written under.
pub async fn save_snapshot(
    conn: &ConnectionManager,
    document: &BTreeMap<String, WindowSummary>,
    retention: Duration,
) -> Result<String, StoreError> {
    let key = format!("stats/{}", Utc::now().timestamp_millis());
    let payload = serde_json::to_string(document)?;
    let mut conn = conn.clone();
    conn.set_ex::<_, _, ()>(&key, payload, retention.as_secs())
        .await?;
    Ok(key)
}
