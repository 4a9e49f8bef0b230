use std::collections::HashMap;

use crate::model::{EnrichedTick, Tick};

/// Flags abrupt per-symbol price moves.
///
/// A tick is anomalous when its relative change against the immediately
/// preceding processed price for the same symbol exceeds the threshold.
/// The first tick per symbol is never anomalous, and state lives only in
/// memory: after a restart every symbol starts over.
#[derive(Debug)]
pub struct AnomalyDetector {
    threshold: f64,
    last_price: HashMap<String, f64>,
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        assert!(
            threshold.is_finite() && threshold > 0.0,
            "anomaly threshold must be positive"
        );
        Self {
            threshold,
            last_price: HashMap::new(),
        }
    }

    /// Flag one tick and advance the symbol's last-price state. The state
    /// update is unconditional: an anomalous price still becomes the new
    /// baseline for the next comparison.
    pub fn enrich(&mut self, tick: Tick) -> EnrichedTick {
        let is_anomaly = match self.last_price.get(&tick.symbol) {
            Some(&prev) if prev > 0.0 => {
                let change = (tick.price - prev) / prev;
                change.abs() > self.threshold
            }
            _ => false,
        };
        self.last_price.insert(tick.symbol.clone(), tick.price);
        EnrichedTick::from_tick(tick, is_anomaly)
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_price.get(symbol).copied()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
