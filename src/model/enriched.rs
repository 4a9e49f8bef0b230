use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tick::Tick;

/// A tick after anomaly flagging, as written to the durable store.
///
/// The rolling-statistic fields are reserved in the schema but not computed
/// in this version; they are persisted as NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTick {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub ts: DateTime<Utc>,
    pub ma_1m: Option<f64>,
    pub ma_5m: Option<f64>,
    pub vol_1m: Option<f64>,
    pub is_anomaly: bool,
}

impl EnrichedTick {
    pub fn from_tick(tick: Tick, is_anomaly: bool) -> Self {
        Self {
            symbol: tick.symbol,
            price: tick.price,
            volume: tick.volume,
            ts: tick.ts,
            ma_1m: None,
            ma_5m: None,
            vol_1m: None,
            is_anomaly,
        }
    }
}
