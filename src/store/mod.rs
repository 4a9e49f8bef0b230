pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;
use crate::model::EnrichedTick;

pub use self::postgres::PostgresStore;
pub use self::redis::RedisCache;

/// Append-only history of enriched ticks. The authoritative record.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn insert_tick(&self, tick: &EnrichedTick) -> Result<(), StoreError>;

    /// Rows for `symbol`, newest first, at most `limit`.
    async fn history(&self, symbol: &str, limit: u32) -> Result<Vec<EnrichedTick>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Best-effort latest-value store: one overwritable entry per symbol.
#[async_trait]
pub trait LatestCache: Send + Sync {
    /// Full overwrite of the symbol's entry; never a merge.
    async fn put_latest(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    async fn get_latest(&self, symbol: &str) -> Result<Option<CacheEntry>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Text-formatted record stored under `price:{symbol}`.
///
/// Numbers use Rust's shortest round-trip formatting and the timestamp is
/// RFC3339 with nanoseconds, so a written tick reads back bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub symbol: String,
    pub price: String,
    pub volume: String,
    pub ts: String,
    pub is_anomaly: String,
}

impl CacheEntry {
    pub fn from_tick(tick: &EnrichedTick) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            price: format!("{}", tick.price),
            volume: format!("{}", tick.volume),
            ts: tick.ts.to_rfc3339_opts(SecondsFormat::Nanos, true),
            is_anomaly: if tick.is_anomaly { "1" } else { "0" }.to_string(),
        }
    }

    /// Parse the stored text fields back into a tick. Any field that fails
    /// to parse surfaces as a `MalformedEntry` serving error; an empty
    /// anomaly flag is read as false for entries written before the flag
    /// existed.
    pub fn parse(&self) -> Result<EnrichedTick, StoreError> {
        let price: f64 = self.price.parse().map_err(|_| StoreError::MalformedEntry {
            field: "price",
            value: self.price.clone(),
        })?;
        let volume: f64 = self.volume.parse().map_err(|_| StoreError::MalformedEntry {
            field: "volume",
            value: self.volume.clone(),
        })?;
        let ts: DateTime<Utc> = DateTime::parse_from_rfc3339(&self.ts)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| StoreError::MalformedEntry {
                field: "ts",
                value: self.ts.clone(),
            })?;
        let is_anomaly = match self.is_anomaly.as_str() {
            "1" => true,
            "0" | "" => false,
            other => {
                return Err(StoreError::MalformedEntry {
                    field: "is_anomaly",
                    value: other.to_string(),
                })
            }
        };
        Ok(EnrichedTick {
            symbol: self.symbol.clone(),
            price,
            volume,
            ts,
            ma_1m: None,
            ma_5m: None,
            vol_1m: None,
            is_anomaly,
        })
    }
}

/// Cache key for a symbol's latest-value entry.
pub fn cache_key(symbol: &str) -> String {
    format!("price:{}", symbol)
}
