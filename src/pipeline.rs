use std::sync::Arc;

use crate::detector::AnomalyDetector;
use crate::error::{DecodeError, StoreError};
use crate::model::{EnrichedTick, Tick};
use crate::store::{CacheEntry, DurableStore, LatestCache};

/// Where the cache step of a dual write ended up.
#[derive(Debug)]
pub enum CacheStatus {
    Written,
    Failed(StoreError),
    /// Not attempted because the durable insert failed.
    Skipped,
}

/// Outcome of one dual-persistence attempt. The two writes are not atomic:
/// the durable store is authoritative and the cache is best-effort, so a
/// failed cache step leaves the committed durable row standing.
#[derive(Debug)]
pub struct WriteOutcome {
    pub durable: Result<(), StoreError>,
    pub cache: CacheStatus,
}

impl WriteOutcome {
    pub fn fully_persisted(&self) -> bool {
        self.durable.is_ok() && matches!(self.cache, CacheStatus::Written)
    }
}

/// Persists one enriched tick to the durable store, then overwrites the
/// symbol's latest-value entry. No rollback in either direction.
pub struct DualWriter {
    durable: Arc<dyn DurableStore>,
    cache: Arc<dyn LatestCache>,
}

impl DualWriter {
    pub fn new(durable: Arc<dyn DurableStore>, cache: Arc<dyn LatestCache>) -> Self {
        Self { durable, cache }
    }

    pub async fn write(&self, tick: &EnrichedTick) -> WriteOutcome {
        if let Err(e) = self.durable.insert_tick(tick).await {
            // The symbol's prior cache entry, if any, stays as it was.
            return WriteOutcome {
                durable: Err(e),
                cache: CacheStatus::Skipped,
            };
        }

        let entry = CacheEntry::from_tick(tick);
        match self.cache.put_latest(&entry).await {
            Ok(()) => WriteOutcome {
                durable: Ok(()),
                cache: CacheStatus::Written,
            },
            Err(e) => WriteOutcome {
                durable: Ok(()),
                cache: CacheStatus::Failed(e),
            },
        }
    }
}

/// Drives one message at a time through decode, flag and dual write.
///
/// The processor owns the detector state, which is what makes per-symbol
/// flags coherent: all ticks for a symbol must flow through exactly one
/// processor, sequentially. The transport's partition-by-symbol contract
/// provides that; nothing here locks.
pub struct Processor {
    detector: AnomalyDetector,
    writer: DualWriter,
}

impl Processor {
    pub fn new(detector: AnomalyDetector, writer: DualWriter) -> Self {
        Self { detector, writer }
    }

    /// Process one raw payload. A decode failure drops the message; a store
    /// failure is reported in the outcome but already consumed the message
    /// (at-least-once, no dead-lettering).
    pub async fn process_message(&mut self, payload: &[u8]) -> Result<WriteOutcome, DecodeError> {
        let tick: Tick = serde_json::from_slice(payload)?;
        tick.validate().map_err(DecodeError::Invalid)?;

        let enriched = self.detector.enrich(tick);
        let outcome = self.writer.write(&enriched).await;

        match &outcome.durable {
            Err(e) => tracing::error!(
                symbol = %enriched.symbol,
                error = %e,
                "durable insert failed; tick not persisted"
            ),
            Ok(()) => match &outcome.cache {
                CacheStatus::Failed(e) => tracing::error!(
                    symbol = %enriched.symbol,
                    error = %e,
                    "cache refresh failed; durable row committed, latest value is stale"
                ),
                _ => tracing::info!(
                    symbol = %enriched.symbol,
                    price = enriched.price,
                    volume = enriched.volume,
                    anomaly = enriched.is_anomaly,
                    "processed tick"
                ),
            },
        }

        Ok(outcome)
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }
}
