//! Persistent telemetry channel.
//!
//! [`ConnectionChannel`] owns one websocket connection. Outbound delta
//! messages are queued to a writer task; inbound frames are interpreted
//! by a reader task and pushed, in arrival order, onto a single
//! [`InboundEvent`] queue for one consumer.
//!
//! There is no reconnection: when the socket closes the queue yields
//! [`InboundEvent::Closed`] and ends, and later sends fail with
//! [`MonitorError::Transport`]. [`ConnectionChannel::close`] flushes the
//! outbound queue before returning, so a final `unsubscribe` queued at
//! shutdown reaches the server.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use super::messages::{ClientMessage, InboundEvent, parse_inbound};
use super::subscription::MessageSink;
use crate::error::MonitorError;

/// Sending half of the telemetry channel.
#[derive(Debug)]
pub struct ConnectionChannel {
    outbound: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
}

impl ConnectionChannel {
    /// Opens the websocket at `url` and spawns the reader and writer tasks.
    ///
    /// Returns the channel together with the inbound event queue.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Transport`] if the handshake fails.
    pub async fn connect(
        url: &Url,
        inbound_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<InboundEvent>), MonitorError> {
        tracing::info!(url = %url, "connecting to telemetry channel");

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        tracing::info!("telemetry channel connected");

        let (write, read) = stream.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity.max(1));

        let writer = tokio::spawn(write_loop(write, outbound_rx));
        tokio::spawn(read_loop(read, inbound_tx));

        Ok((
            Self {
                outbound: outbound_tx,
                writer,
            },
            inbound_rx,
        ))
    }

    /// Stops accepting messages and waits until every queued message and
    /// the close frame have been written.
    pub async fn close(self) {
        let Self { outbound, writer } = self;
        drop(outbound);
        if let Err(e) = writer.await {
            tracing::warn!(error = %e, "channel writer task failed");
        }
    }
}

impl MessageSink for ConnectionChannel {
    fn send(&mut self, message: ClientMessage) -> Result<(), MonitorError> {
        let text = serde_json::to_string(&message)?;
        self.outbound
            .send(text)
            .map_err(|_| MonitorError::Transport("channel closed".to_string()))?;
        tracing::debug!(
            kind = message.kind_str(),
            devices = ?message.devices(),
            "delta message queued"
        );
        Ok(())
    }
}

/// Drains the outbound queue into the socket until either side closes.
async fn write_loop<W>(mut write: W, mut outbound: mpsc::UnboundedReceiver<String>)
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(text) = outbound.recv().await {
        if let Err(e) = write.send(Message::text(text)).await {
            tracing::warn!(error = %e, "channel send failed");
            break;
        }
    }
    let _ = write.close().await;
    tracing::debug!("channel writer stopped");
}

/// Interprets inbound frames until the socket ends, then emits `Closed`.
async fn read_loop<R>(mut read: R, inbound: mpsc::Sender<InboundEvent>)
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = read.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => parse_inbound(text.as_str()),
            Ok(Message::Close(frame)) => {
                if let Some(ref cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "channel close frame received");
                } else {
                    tracing::info!("channel close frame received (no payload)");
                }
                break;
            }
            Ok(_) => {
                // Binary, Ping, Pong, Frame
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "channel receive failed");
                InboundEvent::TransportError(e.to_string())
            }
        };

        let failed = matches!(event, InboundEvent::TransportError(_));
        if inbound.send(event).await.is_err() {
            tracing::debug!("inbound consumer gone, stopping reader");
            return;
        }
        if failed {
            break;
        }
    }

    let _ = inbound.send(InboundEvent::Closed).await;
    tracing::info!("telemetry channel closed");
}
