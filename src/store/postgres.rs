use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::NoTls;

use super::DurableStore;
use crate::error::StoreError;
use crate::model::EnrichedTick;

const INSERT_TICK: &str = "
    INSERT INTO price_ticks_enriched
        (symbol, price, volume, ts, ma_1m, ma_5m, vol_1m, is_anomaly)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";

const SELECT_HISTORY: &str = "
    SELECT symbol, price, volume, ts, ma_1m, ma_5m, vol_1m, is_anomaly
    FROM price_ticks_enriched
    WHERE symbol = $1
    ORDER BY ts DESC
    LIMIT $2
";

/// Durable store backed by Postgres. Insert-only: rows are never updated
/// or deleted by the pipeline.
pub struct PostgresStore {
    client: tokio_postgres::Client,
    op_timeout: Duration,
}

impl PostgresStore {
    pub async fn connect(dsn: &str, op_timeout_ms: u64) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;
        // The connection object drives the socket; it ends when the client drops.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection terminated");
            }
        });
        Ok(Self {
            client,
            op_timeout: Duration::from_millis(op_timeout_ms),
        })
    }

    /// Create the enriched-tick table and its read index if missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.client
            .batch_execute(
                "
                CREATE TABLE IF NOT EXISTS price_ticks_enriched (
                    symbol     TEXT NOT NULL,
                    price      DOUBLE PRECISION NOT NULL,
                    volume     DOUBLE PRECISION NOT NULL,
                    ts         TIMESTAMPTZ NOT NULL,
                    ma_1m      DOUBLE PRECISION,
                    ma_5m      DOUBLE PRECISION,
                    vol_1m     DOUBLE PRECISION,
                    is_anomaly BOOLEAN NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_price_ticks_symbol_ts
                    ON price_ticks_enriched (symbol, ts DESC);
                ",
            )
            .await?;
        Ok(())
    }

    fn timeout_ms(&self) -> u64 {
        self.op_timeout.as_millis() as u64
    }
}

#[async_trait]
impl DurableStore for PostgresStore {
    async fn insert_tick(&self, tick: &EnrichedTick) -> Result<(), StoreError> {
        let result = tokio::time::timeout(
            self.op_timeout,
            self.client.execute(
                INSERT_TICK,
                &[
                    &tick.symbol,
                    &tick.price,
                    &tick.volume,
                    &tick.ts,
                    &tick.ma_1m,
                    &tick.ma_5m,
                    &tick.vol_1m,
                    &tick.is_anomaly,
                ],
            ),
        )
        .await;
        match result {
            Err(_) => Err(StoreError::Timeout(self.timeout_ms())),
            Ok(inserted) => {
                inserted?;
                Ok(())
            }
        }
    }

    async fn history(&self, symbol: &str, limit: u32) -> Result<Vec<EnrichedTick>, StoreError> {
        let limit = limit as i64;
        let result = tokio::time::timeout(
            self.op_timeout,
            self.client.query(SELECT_HISTORY, &[&symbol, &limit]),
        )
        .await;
        let rows = match result {
            Err(_) => return Err(StoreError::Timeout(self.timeout_ms())),
            Ok(queried) => queried?,
        };

        let mut ticks = Vec::with_capacity(rows.len());
        for row in rows {
            ticks.push(EnrichedTick {
                symbol: row.get(0),
                price: row.get(1),
                volume: row.get(2),
                ts: row.get(3),
                ma_1m: row.get(4),
                ma_5m: row.get(5),
                vol_1m: row.get(6),
                is_anomaly: row.get(7),
            });
        }
        Ok(ticks)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match tokio::time::timeout(self.op_timeout, self.client.simple_query("SELECT 1")).await {
            Err(_) => Err(StoreError::Timeout(self.timeout_ms())),
            Ok(result) => {
                result?;
                Ok(())
            }
        }
    }
}
