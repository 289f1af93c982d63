//! WebSocket Session Pump
//!
//! Drives one upgraded socket: a read loop with a liveness deadline and a
//! write loop that drains the connection's outbound queue and keeps the peer
//! alive with pings. Either side stopping tears the whole session down.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep_until, timeout, Instant};

use crate::config::WebSocketSettings;
use crate::shared::delivery::OutboundEvent;

/// Callbacks for inbound traffic on a session.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// A text frame arrived.
    async fn on_text(&self, text: &str);

    /// The session is ending. Must close the outbound queue.
    async fn on_close(&self);
}

/// Read and write deadlines of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub write_wait: Duration,
}

impl From<&WebSocketSettings> for Liveness {
    fn from(settings: &WebSocketSettings) -> Self {
        Self {
            pong_wait: settings.pong_wait(),
            ping_period: settings.ping_period(),
            write_wait: settings.write_wait(),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Close frame or end of stream
    ClientClosed,
    ReadError,
    /// Nothing was read within `pong_wait`
    ReadTimeout,
    /// The write loop stopped (queue closed or a write failed)
    WriterStopped,
}

/// Pump `socket` until it ends, then run the handler's teardown.
pub async fn run<H: FrameHandler>(
    socket: WebSocket,
    outbound: mpsc::Receiver<OutboundEvent>,
    liveness: Liveness,
    handler: &H,
) -> EndReason {
    let (sink, mut stream) = socket.split();
    let (writer_done, mut writer_stopped) = oneshot::channel::<()>();
    let mut writer = tokio::spawn(write_loop(sink, outbound, liveness, writer_done));

    let reason = loop {
        let deadline = Instant::now() + liveness.pong_wait;

        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handler.on_text(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break EndReason::ClientClosed,
                // Pings, pongs and binary frames only extend the deadline
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket read error");
                    break EndReason::ReadError;
                }
            },
            _ = sleep_until(deadline) => break EndReason::ReadTimeout,
            _ = &mut writer_stopped => break EndReason::WriterStopped,
        }
    };

    handler.on_close().await;

    // The closed queue lets the writer send a close frame and exit
    if timeout(liveness.write_wait, &mut writer).await.is_err() {
        writer.abort();
    }

    reason
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<OutboundEvent>,
    liveness: Liveness,
    _done: oneshot::Sender<()>,
) {
    let mut ticker = interval_at(Instant::now() + liveness.ping_period, liveness.ping_period);

    loop {
        tokio::select! {
            event = outbound.recv() => match event {
                Some(event) => {
                    let text = match serde_json::to_string(&*event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize outbound event");
                            continue;
                        }
                    };
                    if !write(&mut sink, Message::Text(text.into()), liveness.write_wait).await {
                        break;
                    }
                }
                None => {
                    write(&mut sink, Message::Close(None), liveness.write_wait).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                if !write(&mut sink, Message::Ping(Default::default()), liveness.write_wait).await {
                    break;
                }
            }
        }
    }
}

async fn write(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    write_wait: Duration,
) -> bool {
    match timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "WebSocket write failed");
            false
        }
        Err(_) => {
            tracing::debug!("WebSocket write timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_from_settings() {
        let settings = WebSocketSettings {
            pong_wait_secs: 60,
            write_wait_secs: 10,
            ..crate::config::Settings::default().websocket
        };

        let liveness = Liveness::from(&settings);

        assert_eq!(liveness.pong_wait, Duration::from_secs(60));
        assert_eq!(liveness.ping_period, Duration::from_secs(54));
        assert_eq!(liveness.write_wait, Duration::from_secs(10));
        assert!(liveness.ping_period < liveness.pong_wait);
    }
}
