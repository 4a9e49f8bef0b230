use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::model::Tick;
use crate::pipeline::Processor;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum LoopExit {
    Shutdown,
    Disconnected(String),
}

/// Subscribes to the tick topic and drives the pipeline one message at a
/// time, preserving the transport's per-symbol ordering.
///
/// Failure policy, in line with the rest of the pipeline: the initial
/// connect failure is fatal (the process should not start half-wired);
/// after that, every transport error sleeps a fixed retry delay and
/// reconnects, indefinitely. Messages that fail to decode are dropped
/// one at a time and never stop the loop.
pub struct StreamConsumer {
    url: String,
    retry_delay: Duration,
}

impl StreamConsumer {
    pub fn new(url: String, retry_delay_ms: u64) -> Self {
        Self {
            url,
            retry_delay: Duration::from_millis(retry_delay_ms),
        }
    }

    pub async fn run(
        &self,
        processor: &mut Processor,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut connected_once = false;
        loop {
            let ws = match tokio_tungstenite::connect_async(&self.url).await {
                Ok((ws, _resp)) => ws,
                Err(e) if !connected_once => {
                    return Err(e).context("initial transport connect failed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transport connect failed; retrying");
                    if wait_or_shutdown(self.retry_delay, &mut shutdown).await {
                        return Ok(());
                    }
                    continue;
                }
            };
            connected_once = true;
            tracing::info!(url = %self.url, "transport connected");

            match self.consume(ws, processor, &mut shutdown).await {
                LoopExit::Shutdown => return Ok(()),
                LoopExit::Disconnected(reason) => {
                    tracing::warn!(reason = %reason, "transport read failed; reconnecting");
                    if wait_or_shutdown(self.retry_delay, &mut shutdown).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn consume(
        &self,
        ws: WsStream,
        processor: &mut Processor,
        shutdown: &mut watch::Receiver<bool>,
    ) -> LoopExit {
        let (_write, mut read) = ws.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            self.handle_payload(text.as_bytes(), processor).await;
                        }
                        Some(Ok(tungstenite::Message::Binary(payload))) => {
                            self.handle_payload(&payload, processor).await;
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tokio-tungstenite answers pings automatically
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return LoopExit::Disconnected(e.to_string()),
                        None => return LoopExit::Disconnected("stream ended".to_string()),
                    }
                }
                _ = shutdown.changed() => return LoopExit::Shutdown,
            }
        }
    }

    async fn handle_payload(&self, payload: &[u8], processor: &mut Processor) {
        // The message counts as consumed whatever happens downstream:
        // at-least-once delivery, store failures are logged by the
        // processor and the loop moves on.
        if let Err(e) = processor.process_message(payload).await {
            tracing::warn!(error = %e, "dropping undecodable message");
        }
    }
}

async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.changed() => true,
    }
}

/// Producer side of the transport, used by the synthetic tick generator.
pub struct StreamPublisher {
    ws: WsStream,
}

impl StreamPublisher {
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _resp) = tokio_tungstenite::connect_async(url)
            .await
            .context("transport connect failed")?;
        Ok(Self { ws })
    }

    /// Publish one tick as a JSON text frame. The symbol field inside the
    /// payload is the partition key on the broker side.
    pub async fn publish(&mut self, tick: &Tick) -> Result<()> {
        let payload = serde_json::to_string(tick).context("failed to encode tick")?;
        self.ws
            .send(tungstenite::Message::Text(payload))
            .await
            .context("transport send failed")?;
        Ok(())
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
