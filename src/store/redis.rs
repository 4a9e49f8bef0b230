use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{cache_key, CacheEntry, LatestCache};
use crate::error::StoreError;

/// Latest-value cache backed by Redis hashes, one hash per symbol.
pub struct RedisCache {
    manager: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    pub async fn connect(url: &str, op_timeout_ms: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager,
            op_timeout: Duration::from_millis(op_timeout_ms),
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.op_timeout.as_millis() as u64
    }
}

#[async_trait]
impl LatestCache for RedisCache {
    async fn put_latest(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let key = cache_key(&entry.symbol);
        let fields: [(&str, &str); 5] = [
            ("symbol", &entry.symbol),
            ("price", &entry.price),
            ("volume", &entry.volume),
            ("ts", &entry.ts),
            ("is_anomaly", &entry.is_anomaly),
        ];
        let write = conn.hset_multiple::<_, _, _, ()>(key, &fields);
        match tokio::time::timeout(self.op_timeout, write).await {
            Err(_) => Err(StoreError::Timeout(self.timeout_ms())),
            Ok(result) => {
                result?;
                Ok(())
            }
        }
    }

    async fn get_latest(&self, symbol: &str) -> Result<Option<CacheEntry>, StoreError> {
        let mut conn = self.manager.clone();
        let read = conn.hgetall::<_, HashMap<String, String>>(cache_key(symbol));
        let fields = match tokio::time::timeout(self.op_timeout, read).await {
            Err(_) => return Err(StoreError::Timeout(self.timeout_ms())),
            Ok(result) => result?,
        };
        if fields.is_empty() {
            return Ok(None);
        }

        let get = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Ok(Some(CacheEntry {
            symbol: symbol.to_string(),
            price: get("price"),
            volume: get("volume"),
            ts: get("ts"),
            is_anomaly: get("is_anomaly"),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let ping = async move {
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
        };
        match tokio::time::timeout(self.op_timeout, ping).await {
            Err(_) => Err(StoreError::Timeout(self.timeout_ms())),
            Ok(result) => result.map_err(StoreError::from),
        }
    }
}
