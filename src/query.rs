use std::sync::Arc;

use crate::error::StoreError;
use crate::model::EnrichedTick;
use crate::store::{DurableStore, LatestCache};

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// Replace an out-of-range or unparseable history limit with the default.
/// Values in [1, 1000] are honored exactly; everything else, including a
/// missing or non-numeric parameter, becomes 100.
pub fn effective_limit(raw: Option<&str>) -> u32 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if n >= 1 && n <= MAX_HISTORY_LIMIT as i64 => n as u32,
        _ => DEFAULT_HISTORY_LIMIT,
    }
}

/// Read side of the pipeline, serving two patterns with different
/// freshness/latency tradeoffs: latest (cache only) and history (durable
/// store only).
pub struct QueryService {
    durable: Arc<dyn DurableStore>,
    cache: Arc<dyn LatestCache>,
}

impl QueryService {
    pub fn new(durable: Arc<dyn DurableStore>, cache: Arc<dyn LatestCache>) -> Self {
        Self { durable, cache }
    }

    /// Latest known value for a symbol, read from the cache alone. There is
    /// no fallback to the durable store: when the cache is cold, evicted or
    /// restarted, latest is simply unavailable even though history exists.
    pub async fn latest(&self, symbol: &str) -> Result<Option<EnrichedTick>, StoreError> {
        match self.cache.get_latest(symbol).await? {
            None => Ok(None),
            Some(entry) => entry.parse().map(Some),
        }
    }

    /// Recent durable history for a symbol, newest first, at most `limit`
    /// rows. An unknown symbol yields an empty list, not an error.
    pub async fn history(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<EnrichedTick>, StoreError> {
        let limit = if (1..=MAX_HISTORY_LIMIT).contains(&limit) {
            limit
        } else {
            DEFAULT_HISTORY_LIMIT
        };
        self.durable.history(symbol, limit).await
    }

    /// Liveness probe against the durable store.
    pub async fn ping_durable(&self) -> Result<(), StoreError> {
        self.durable.ping().await
    }

    /// Liveness probe against the cache.
    pub async fn ping_cache(&self) -> Result<(), StoreError> {
        self.cache.ping().await
    }
}
