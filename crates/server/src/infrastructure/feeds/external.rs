use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tickerhub_core::{Price, Symbol};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, trace, warn};

use super::backoff::Backoff;
use crate::application::ports::{InstrumentRepository, PriceFeed, PublishError, SnapshotPublisher};
use crate::infrastructure::config::ExternalFeedConfig;
use crate::shutdown::Shutdown;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed connection error: {0}")]
    Connection(#[from] tungstenite::Error),

    #[error("Malformed feed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Feed closed the connection")]
    Closed,
}

/// Inbound envelope. Only `trade` messages carry observations.
#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<TradeObservation>,
}

#[derive(Debug, Deserialize)]
struct TradeObservation {
    #[serde(rename = "s")]
    symbol: Symbol,
    #[serde(rename = "p")]
    price: Price,
    #[serde(rename = "t", default)]
    timestamp_ms: Option<i64>,
    #[serde(rename = "v", default)]
    volume: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    symbol: &'a str,
}

/// Bridges a Finnhub-compatible trade stream into the store
///
/// Without a credential the feed is inert. Otherwise it keeps a session
/// open, subscribing to every configured symbol on connect, and reconnects
/// with capped exponential backoff whenever the session fails.
pub struct ExternalFeed<S, P>
where
    S: InstrumentRepository,
    P: SnapshotPublisher,
{
    store: Arc<S>,
    publisher: Arc<P>,
    config: ExternalFeedConfig,
}

impl<S, P> ExternalFeed<S, P>
where
    S: InstrumentRepository,
    P: SnapshotPublisher,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, config: ExternalFeedConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Apply one inbound text message.
    ///
    /// Returns the number of observations applied. Non-trade messages are
    /// ignored; a trade message publishes a full snapshot once applied.
    pub async fn handle_message(&self, text: &str) -> Result<usize, FeedError> {
        let message: FeedMessage = serde_json::from_str(text)?;

        if message.kind != "trade" {
            trace!(kind = %message.kind, "Ignoring feed message");
            return Ok(0);
        }

        for trade in &message.data {
            trace!(
                symbol = %trade.symbol,
                price = trade.price,
                timestamp_ms = ?trade.timestamp_ms,
                volume = ?trade.volume,
                "Trade"
            );
            self.store.update_price(&trade.symbol, trade.price);
        }

        if self.store.instrument_count() > 0 {
            self.publisher
                .publish(self.store.snapshot_instruments())
                .await?;
        }

        Ok(message.data.len())
    }

    /// One connection lifetime. `Ok` means shutdown was requested.
    async fn session(
        &self,
        endpoint: &str,
        backoff: &mut Backoff,
        shutdown: &mut Shutdown,
    ) -> Result<(), FeedError> {
        let (stream, _) = tokio::select! {
            _ = shutdown.wait() => return Ok(()),
            connected = connect_async(endpoint) => connected?,
        };
        let (mut write, mut read) = stream.split();

        for symbol in &self.config.symbols {
            let request = serde_json::to_string(&SubscribeRequest {
                kind: "subscribe",
                symbol,
            })?;
            write.send(Message::Text(request.into())).await?;
        }

        backoff.reset();
        info!(symbols = self.config.symbols.len(), "External feed connected");

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => match self.handle_message(text.as_str()).await {
                        Ok(applied) => debug!(applied, "Feed message handled"),
                        Err(FeedError::Json(e)) => {
                            warn!(error = %e, "Dropping malformed feed message");
                        }
                        Err(e) => return Err(e),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "External feed sent close");
                        return Err(FeedError::Closed);
                    }
                    // Pings are answered by the transport
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(FeedError::Closed),
                },
            }
        }
    }
}

#[async_trait]
impl<S, P> PriceFeed for ExternalFeed<S, P>
where
    S: InstrumentRepository + 'static,
    P: SnapshotPublisher + 'static,
{
    fn name(&self) -> &'static str {
        "external"
    }

    async fn run(&mut self, mut shutdown: Shutdown) {
        let Some(endpoint) = self.config.endpoint() else {
            warn!("No feed credential configured, external feed inactive");
            return;
        };

        let mut backoff = Backoff::from_config(&self.config.reconnect);
        info!(url = %self.config.url, "External feed starting");

        while !shutdown.is_triggered() {
            match self.session(&endpoint, &mut backoff, &mut shutdown).await {
                Ok(()) => break,
                Err(FeedError::Publish(e)) => {
                    warn!(error = %e, "Snapshot consumer gone, external feed stopping");
                    break;
                }
                Err(e) => {
                    let Some(delay) = backoff.next_delay() else {
                        error!(
                            attempts = backoff.attempt(),
                            error = %e,
                            "External feed giving up after repeated failures"
                        );
                        break;
                    };

                    warn!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "External feed disconnected, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown.wait() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("External feed stopped");
    }
}
