use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw price/volume observation, as published on the tick topic.
///
/// `symbol` doubles as the transport partition key, so all ticks for one
/// symbol arrive in order at a single consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub ts: DateTime<Utc>,
}

impl Tick {
    /// Contract checks beyond JSON well-formedness. A tick failing these is
    /// dropped by the consumer exactly like an unparseable payload.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.symbol.trim().is_empty() {
            return Err("symbol is empty");
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err("price must be positive and finite");
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err("volume must be non-negative and finite");
        }
        Ok(())
    }
}
