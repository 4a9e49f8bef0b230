use std::sync::Arc;

use anyhow::{Context, Result};

use pricing_pipeline::api;
use pricing_pipeline::config::Config;
use pricing_pipeline::query::QueryService;
use pricing_pipeline::store::{DurableStore, LatestCache, PostgresStore, RedisCache};

#[tokio::main]
async fn main() -> Result<()> {
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

    // Serving with an unreachable store would fail every request; refuse
    // to start instead.
    let postgres =
        PostgresStore::connect(&config.stores.postgres_dsn, config.stores.op_timeout_ms)
            .await
            .context("failed to connect to postgres")?;
    postgres.ping().await.context("postgres ping failed")?;

    let redis = RedisCache::connect(&config.stores.redis_url, config.stores.op_timeout_ms)
        .await
        .context("failed to connect to redis")?;
    redis.ping().await.context("redis ping failed")?;

    let durable: Arc<dyn DurableStore> = Arc::new(postgres);
    let cache: Arc<dyn LatestCache> = Arc::new(redis);
    let query = Arc::new(QueryService::new(durable, cache));

    let app = api::router(query, &config.http.cors_allowed_origins);
    let listener = tokio::net::TcpListener::bind(&config.http.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http.addr))?;

    tracing::info!(addr = %config.http.addr, "starting api-gateway");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("server exited")?;
    Ok(())
}
