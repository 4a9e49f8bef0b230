#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use pricing_pipeline::error::StoreError;
use pricing_pipeline::model::{EnrichedTick, Tick};
use pricing_pipeline::store::{CacheEntry, DurableStore, LatestCache};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn tick(symbol: &str, price: f64, ts_secs: i64) -> Tick {
    Tick {
        symbol: symbol.to_string(),
        price,
        volume: 1.0,
        ts: ts(ts_secs),
    }
}

pub fn enriched(symbol: &str, price: f64, ts_secs: i64, is_anomaly: bool) -> EnrichedTick {
    EnrichedTick {
        symbol: symbol.to_string(),
        price,
        volume: 1.0,
        ts: ts(ts_secs),
        ma_1m: None,
        ma_5m: None,
        vol_1m: None,
        is_anomaly,
    }
}

/// In-memory durable store with injectable failures.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<EnrichedTick>>,
    fail_inserts: AtomicBool,
    fail_pings: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<EnrichedTick> {
        self.rows.lock().unwrap().clone()
    }

    /// Seed a row directly, bypassing the trait.
    pub fn push(&self, tick: EnrichedTick) {
        self.rows.lock().unwrap().push(tick);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn insert_tick(&self, tick: &EnrichedTick) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected durable failure".into()));
        }
        self.rows.lock().unwrap().push(tick.clone());
        Ok(())
    }

    async fn history(&self, symbol: &str, limit: u32) -> Result<Vec<EnrichedTick>, StoreError> {
        let mut rows: Vec<EnrichedTick> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.symbol == symbol)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.ts.cmp(&a.ts));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected postgres outage".into()));
        }
        Ok(())
    }
}

/// In-memory latest-value cache with injectable failures.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    fail_puts: AtomicBool,
    fail_pings: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub fn entry(&self, symbol: &str) -> Option<CacheEntry> {
        self.entries.lock().unwrap().get(symbol).cloned()
    }

    pub fn set_entry(&self, entry: CacheEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.symbol.clone(), entry);
    }
}

#[async_trait]
impl LatestCache for MemoryCache {
    async fn put_latest(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected cache failure".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(entry.symbol.clone(), entry.clone());
        Ok(())
    }

    async fn get_latest(&self, symbol: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.lock().unwrap().get(symbol).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected redis outage".into()));
        }
        Ok(())
    }
}
