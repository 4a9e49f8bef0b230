use chrono::{DateTime, Utc};
use rand::Rng;

use crate::model::Tick;

/// Base price a symbol's synthetic ticks jitter around.
pub fn base_price(symbol: &str) -> f64 {
    match symbol {
        "BTC-USD" => 50_000.0,
        "ETH-USD" => 3_000.0,
        _ => 100.0,
    }
}

/// Synthetic tick source: one possible producer feeding the transport.
/// Prices jitter ±1% around a fixed per-symbol base, volumes are uniform
/// in [0.1, 5.1).
#[derive(Debug, Clone)]
pub struct TickGenerator {
    symbols: Vec<String>,
}

impl TickGenerator {
    pub fn new(symbols: &[String]) -> Self {
        Self {
            symbols: symbols.to_vec(),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn generate<R: Rng>(&self, rng: &mut R, symbol: &str, ts: DateTime<Utc>) -> Tick {
        let delta = (rng.gen::<f64>() - 0.5) * 0.02;
        let price = base_price(symbol) * (1.0 + delta);
        let volume = 0.1 + rng.gen::<f64>() * 5.0;
        Tick {
            symbol: symbol.to_string(),
            price,
            volume,
            ts,
        }
    }

    /// One tick per configured symbol, all stamped with the same instant.
    pub fn generate_round<R: Rng>(&self, rng: &mut R, ts: DateTime<Utc>) -> Vec<Tick> {
        self.symbols
            .iter()
            .map(|s| self.generate(rng, s, ts))
            .collect()
    }
}
