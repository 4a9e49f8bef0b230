use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use pricing_pipeline::config::Config;
use pricing_pipeline::detector::AnomalyDetector;
use pricing_pipeline::pipeline::{DualWriter, Processor};
use pricing_pipeline::store::{DurableStore, LatestCache, PostgresStore, RedisCache};
use pricing_pipeline::transport::StreamConsumer;

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .init();

    tracing::info!(
        transport = %config.transport.url,
        topic = %config.transport.topic,
        group = %config.transport.group_id,
        "starting pipeline-processor"
    );

    // Unreachable dependencies at startup are fatal; after this point the
    // consumer loop survives any transient failure.
    let postgres =
        PostgresStore::connect(&config.stores.postgres_dsn, config.stores.op_timeout_ms)
            .await
            .context("failed to connect to postgres")?;
    postgres
        .ensure_schema()
        .await
        .context("failed to ensure postgres schema")?;

    let redis = RedisCache::connect(&config.stores.redis_url, config.stores.op_timeout_ms)
        .await
        .context("failed to connect to redis")?;
    redis.ping().await.context("redis ping failed")?;

    let durable: Arc<dyn DurableStore> = Arc::new(postgres);
    let cache: Arc<dyn LatestCache> = Arc::new(redis);

    let detector = AnomalyDetector::new(config.detector.anomaly_threshold);
    let writer = DualWriter::new(durable, cache);
    let mut processor = Processor::new(detector, writer);

    let consumer = StreamConsumer::new(
        config.transport.subscribe_url(),
        config.transport.retry_delay_ms,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    consumer.run(&mut processor, shutdown_rx).await?;
    tracing::info!("pipeline-processor stopped");
    Ok(())
}
