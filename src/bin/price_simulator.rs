use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use pricing_pipeline::config::Config;
use pricing_pipeline::sim::TickGenerator;
use pricing_pipeline::transport::StreamPublisher;

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

    let url = config.transport.publish_url();
    let retry_delay = Duration::from_millis(config.transport.retry_delay_ms);
    let generator = TickGenerator::new(&config.simulator.symbols);
    let mut rng = StdRng::from_entropy();

    tracing::info!(
        url = %url,
        symbols = ?config.simulator.symbols,
        interval_ms = config.simulator.interval_ms,
        "starting price-simulator"
    );

    let mut publisher = StreamPublisher::connect(&url)
        .await
        .context("initial transport connect failed")?;

    let mut interval =
        tokio::time::interval(Duration::from_millis(config.simulator.interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = chrono::Utc::now();
                for tick in generator.generate_round(&mut rng, now) {
                    if let Err(e) = publisher.publish(&tick).await {
                        tracing::warn!(error = %e, "publish failed; reconnecting");
                        tokio::time::sleep(retry_delay).await;
                        match StreamPublisher::connect(&url).await {
                            Ok(p) => publisher = p,
                            Err(e) => tracing::warn!(error = %e, "reconnect failed; will retry"),
                        }
                        break;
                    }
                    tracing::info!(
                        symbol = %tick.symbol,
                        price = tick.price,
                        volume = tick.volume,
                        "produced tick"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    publisher.close().await;
    Ok(())
}
