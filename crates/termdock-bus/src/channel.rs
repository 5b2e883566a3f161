use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use termdock_types::{
    ChannelFrame, DEFAULT_EVENTS_URL, KEEP_ALIVE_INTERVAL, MAX_RECONNECT_ATTEMPTS,
    RECONNECT_DELAY,
};

use crate::EventBus;

/// Network channel parameters; timings are injectable so tests can run the
/// reconnect ladder in milliseconds
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub keep_alive: std::time::Duration,
    pub reconnect_delay: std::time::Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EVENTS_URL.to_string(),
            keep_alive: KEEP_ALIVE_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Observable connection state of the push channel
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    pub status: ChannelStatus,
    pub retry_count: u32,
    pub last_sample_at: Option<DateTime<Utc>>,
}

impl Default for ChannelConnection {
    fn default() -> Self {
        Self {
            status: ChannelStatus::Closed,
            retry_count: 0,
            last_sample_at: None,
        }
    }
}

pub(crate) struct ChannelHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventBus {
    /// Open the push channel and keep it alive in the background.
    ///
    /// A no-op while a channel is already running; tear the bus down first to
    /// reconnect with different parameters.
    pub fn connect(self: &Arc<Self>, config: ChannelConfig) {
        let mut channel = self.channel.lock().unwrap();
        if channel.is_some() {
            warn!("event channel already running, ignoring connect");
            return;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_channel(self.clone(), config, cancel.clone()));
        *channel = Some(ChannelHandle { cancel, task });
    }

    /// Close the push channel.
    ///
    /// Cancels any pending reconnect timer before closing the socket, so an
    /// explicit shutdown cannot be resurrected by a scheduled retry. Safe to
    /// call when no channel is running.
    pub async fn shutdown(&self) {
        let handle = self.channel.lock().unwrap().take();
        let Some(handle) = handle else {
            return;
        };
        handle.cancel.cancel();
        if let Err(err) = handle.task.await {
            warn!("event channel task ended abnormally: {err}");
        }
        self.set_status(ChannelStatus::Closed);
    }

    /// Current connection state snapshot
    pub fn channel_state(&self) -> ChannelConnection {
        self.connection.lock().unwrap().clone()
    }

    fn set_status(&self, status: ChannelStatus) {
        self.connection.lock().unwrap().status = status;
    }

    fn reset_retries(&self) {
        self.connection.lock().unwrap().retry_count = 0;
    }

    fn bump_retries(&self) -> u32 {
        let mut connection = self.connection.lock().unwrap();
        connection.retry_count += 1;
        connection.retry_count
    }

    fn retries_used(&self) -> u32 {
        self.connection.lock().unwrap().retry_count
    }

    fn touch_sample(&self) {
        self.connection.lock().unwrap().last_sample_at = Some(Utc::now());
    }

    fn handle_frame(&self, text: &str) {
        match ChannelFrame::parse(text) {
            Ok(ChannelFrame::Pong) => {
                debug!("keep-alive response received");
                self.touch_sample();
            }
            Ok(ChannelFrame::Ping) => {
                debug!("peer keep-alive probe received");
                self.touch_sample();
            }
            Ok(ChannelFrame::Event(event)) => self.deliver(&event),
            Err(err) => warn!("dropping malformed event frame: {err}"),
        }
    }
}

async fn run_channel(bus: Arc<EventBus>, config: ChannelConfig, cancel: CancellationToken) {
    loop {
        bus.set_status(ChannelStatus::Connecting);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = connect_async(config.url.as_str()) => attempt,
        };

        match attempt {
            Ok((stream, _response)) => {
                info!("event channel open to {}", config.url);
                bus.reset_retries();
                bus.set_status(ChannelStatus::Open);
                run_open_socket(&bus, stream, &config, &cancel).await;
                if cancel.is_cancelled() {
                    break;
                }
            }
            Err(err) => {
                warn!("event channel connect to {} failed: {err}", config.url);
            }
        }

        // Bounded reconnection: fixed delay, hard attempt cap, no backoff.
        let used = bus.retries_used();
        if used >= config.max_reconnect_attempts {
            error!(
                "event channel giving up after {used} reconnect attempts; \
                 push delivery requires a fresh session lifecycle"
            );
            break;
        }
        let attempt_no = bus.bump_retries();
        debug!(
            "event channel reconnect {attempt_no}/{} in {:?}",
            config.max_reconnect_attempts, config.reconnect_delay
        );
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    bus.set_status(ChannelStatus::Closed);
}

async fn run_open_socket(
    bus: &Arc<EventBus>,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: &ChannelConfig,
    cancel: &CancellationToken,
) {
    let (mut sink, mut reader) = stream.split();

    // Probe immediately on open, then on the keep-alive interval.
    if sink
        .send(Message::Text(ChannelFrame::Ping.encode()))
        .await
        .is_err()
    {
        warn!("event channel closed before the first keep-alive probe");
        return;
    }
    bus.touch_sample();

    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + config.keep_alive,
        config.keep_alive,
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                bus.set_status(ChannelStatus::Closing);
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            _ = ticker.tick() => {
                if sink.send(Message::Text(ChannelFrame::Ping.encode())).await.is_err() {
                    warn!("keep-alive probe failed, treating channel as closed");
                    return;
                }
                bus.touch_sample();
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => bus.handle_frame(&text),
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("event channel closed by peer");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!("event channel read failed: {err}");
                    return;
                }
            }
        }
    }
}
