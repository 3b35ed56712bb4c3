//! Self-healing WebSocket client for the remote prediction service
//!
//! Owns one logical connection: outbound frames go through a small bounded
//! queue drained by a writer task, inbound messages are decoded by a reader
//! task and fanned out on a broadcast channel. Any terminal connection event
//! schedules a single-flight reconnect with capped exponential back-off.
//!
//! The frame producer is never blocked: `send_frame` is synchronous and
//! drops frames whenever they cannot be handed off immediately.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::config::defaults;
use crate::config::BackoffConfig;
use crate::types::{FrameMessage, PredictionMessage};

use super::backoff::Backoff;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// ============================================================================
// Error Types
// ============================================================================

/// Transport-level errors. Internal to the streaming module: every variant
/// feeds the back-off cycle rather than surfacing to the frame producer.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection attempt timed out")]
    Timeout,

    #[error("Connection closed by remote")]
    ConnectionClosed,
}

// ============================================================================
// Connection State
// ============================================================================

/// Observable connection state, owned exclusively by the client.
///
/// `Connected` means sends will be attempted, not that they are guaranteed
/// to succeed. Disposal is tracked separately as an absorbing flag; a
/// disposed client observes `Disconnected` forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Connection health counters (snapshot).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamingClientStats {
    pub connected: bool,
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub messages_received: u64,
    pub decode_failures: u64,
    pub reconnections: u64,
}

// ============================================================================
// Streaming Client
// ============================================================================

/// WebSocket streaming client with auto-reconnect.
///
/// Cheap to clone; all clones share the same logical connection.
#[derive(Clone)]
pub struct StreamingClient {
    shared: Arc<ClientShared>,
    state_rx: watch::Receiver<ConnectionState>,
}

struct ClientShared {
    endpoint: String,
    state_tx: watch::Sender<ConnectionState>,
    predictions_tx: broadcast::Sender<PredictionMessage>,
    backoff: Mutex<Backoff>,
    /// Writer handle for the current live connection, if any
    outbound: Mutex<Option<mpsc::Sender<Message>>>,
    /// Cancellation scope of the current live connection's tasks
    conn_cancel: Mutex<Option<CancellationToken>>,
    /// Absorbing dispose flag; checked by every timer and task
    disposed: CancellationToken,
    /// Single-flight guard: at most one pending reconnect timer
    reconnect_pending: AtomicBool,
    /// Bumped on every connect; stale tasks compare before acting
    generation: AtomicU64,

    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    messages_received: AtomicU64,
    decode_failures: AtomicU64,
    reconnections: AtomicU64,
}

impl StreamingClient {
    /// Create a client for the given endpoint. The URL is resolved once
    /// here and never renegotiated.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, backoff: &BackoffConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (predictions_tx, _) = broadcast::channel(defaults::PREDICTION_CHANNEL_CAPACITY);
        let shared = Arc::new(ClientShared {
            endpoint: endpoint.into(),
            state_tx,
            predictions_tx,
            backoff: Mutex::new(Backoff::from_config(backoff)),
            outbound: Mutex::new(None),
            conn_cancel: Mutex::new(None),
            disposed: CancellationToken::new(),
            reconnect_pending: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            reconnections: AtomicU64::new(0),
        });
        Self { shared, state_rx }
    }

    /// Attempt a fresh connection, tearing down any prior one.
    ///
    /// Idempotent and safe to call at any time. On failure the client
    /// transitions to `Disconnected` and schedules a reconnect; the error
    /// is logged, never propagated. No-op after [`dispose`](Self::dispose).
    pub async fn connect(&self) {
        ClientShared::connect(Arc::clone(&self.shared), false).await;
    }

    /// Hand a frame to the transport without blocking.
    ///
    /// While not connected (or after dispose) this is a silent no-op: the
    /// frame is dropped, not buffered. When the outbound queue is full the
    /// frame is likewise dropped — a stale frame is worthless once a newer
    /// one exists.
    pub fn send_frame(&self, frame: &FrameMessage) {
        if self.shared.disposed.is_cancelled() {
            return;
        }
        if *self.state_rx.borrow() != ConnectionState::Connected {
            self.shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("send_frame while disconnected — dropping frame");
            return;
        }
        let wire = match frame.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                self.shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %e, "Failed to encode frame — dropping");
                return;
            }
        };
        let Ok(guard) = self.shared.outbound.lock() else {
            return;
        };
        match guard.as_ref() {
            Some(tx) => match tx.try_send(Message::Text(wire)) {
                Ok(()) => {
                    self.shared.frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    self.shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!("Outbound queue full — dropping frame");
                }
            },
            None => {
                self.shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Subscribe to the fan-out sequence of decoded prediction messages.
    ///
    /// Multiple subscribers each receive every message. Undecodable inbound
    /// payloads never appear here and never terminate the sequence.
    #[must_use]
    pub fn predictions(&self) -> broadcast::Receiver<PredictionMessage> {
        self.shared.predictions_tx.subscribe()
    }

    /// Read-only observation of the connection state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Current connection state snapshot.
    #[must_use]
    pub fn current_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether `dispose()` has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.is_cancelled()
    }

    /// Permanently tear down the connection and stop all reconnects.
    ///
    /// Idempotent. Any in-flight reconnect timer observes the dispose flag
    /// before acting, so a connection cannot race back to life afterwards.
    pub fn dispose(&self) {
        if self.shared.disposed.is_cancelled() {
            return;
        }
        tracing::info!("Disposing streaming client");
        self.shared.disposed.cancel();
        self.shared.teardown_connection();
        self.shared.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Connection health counters.
    #[must_use]
    pub fn stats(&self) -> StreamingClientStats {
        StreamingClientStats {
            connected: *self.state_rx.borrow() == ConnectionState::Connected,
            frames_sent: self.shared.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.shared.frames_dropped.load(Ordering::Relaxed),
            messages_received: self.shared.messages_received.load(Ordering::Relaxed),
            decode_failures: self.shared.decode_failures.load(Ordering::Relaxed),
            reconnections: self.shared.reconnections.load(Ordering::Relaxed),
        }
    }
}

impl ClientShared {
    /// Dial the endpoint and install reader/writer tasks on success.
    ///
    /// `reconnect` marks attempts coming from the back-off timer; only
    /// those count as self-healing events in the stats.
    async fn connect(shared: Arc<Self>, reconnect: bool) {
        if shared.disposed.is_cancelled() {
            tracing::debug!("connect() after dispose — ignoring");
            return;
        }

        // Supersede any prior connection. Stale tasks see the generation
        // bump and stand down without touching state.
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        shared.teardown_connection();
        shared.state_tx.send_replace(ConnectionState::Connecting);

        tracing::info!(endpoint = %shared.endpoint, "Connecting to prediction service");
        let ws = match shared.dial().await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(endpoint = %shared.endpoint, error = %e, "Connection failed");
                shared.on_connection_lost(generation);
                return;
            }
        };

        if shared.disposed.is_cancelled() || shared.generation.load(Ordering::SeqCst) != generation
        {
            // Disposed or superseded while dialing; discard the socket.
            return;
        }

        if let Ok(mut backoff) = shared.backoff.lock() {
            backoff.reset();
        }

        let (sink, stream) = ws.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(defaults::OUTBOUND_QUEUE_DEPTH);
        let conn_cancel = shared.disposed.child_token();

        if let Ok(mut guard) = shared.outbound.lock() {
            *guard = Some(outbound_tx);
        }
        if let Ok(mut guard) = shared.conn_cancel.lock() {
            *guard = Some(conn_cancel.clone());
        }

        shared.state_tx.send_replace(ConnectionState::Connected);
        if shared.disposed.is_cancelled() {
            // dispose() raced the publish above; its teardown may have run
            // before this connection's handles were installed. Redo both so
            // a disposed client observes Disconnected forever.
            shared.teardown_connection();
            shared.state_tx.send_replace(ConnectionState::Disconnected);
            return;
        }
        if reconnect {
            shared.reconnections.fetch_add(1, Ordering::Relaxed);
        }
        tracing::info!(endpoint = %shared.endpoint, "Connection established");

        tokio::spawn(Self::writer_task(
            Arc::clone(&shared),
            sink,
            outbound_rx,
            conn_cancel.clone(),
            generation,
        ));
        tokio::spawn(Self::reader_task(shared, stream, conn_cancel, generation));
    }

    /// Dial the endpoint once, bounding the attempt with a timeout.
    async fn dial(&self) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, StreamError> {
        let dial_timeout = Duration::from_secs(defaults::DIAL_TIMEOUT_SECS);
        match tokio::time::timeout(dial_timeout, connect_async(self.endpoint.as_str())).await {
            Ok(Ok((ws, _response))) => Ok(ws),
            Ok(Err(e)) => Err(StreamError::ConnectionFailed(e.to_string())),
            Err(_) => Err(StreamError::Timeout),
        }
    }

    /// Drain the bounded outbound queue into the WebSocket sink.
    async fn writer_task(
        shared: Arc<Self>,
        mut sink: WsSink,
        mut outbound_rx: mpsc::Receiver<Message>,
        cancel: CancellationToken,
        generation: u64,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = outbound_rx.recv() => {
                    let Some(msg) = frame else { break };
                    if let Err(e) = sink.send(msg).await {
                        let reason = StreamError::ConnectionFailed(e.to_string());
                        tracing::warn!(error = %reason, "Frame send failed");
                        shared.on_connection_lost(generation);
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    }

    /// Decode inbound messages and fan them out until the connection ends.
    async fn reader_task(
        shared: Arc<Self>,
        mut stream: WsStream,
        cancel: CancellationToken,
        generation: u64,
    ) {
        let reason = loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(payload))) => {
                            shared.handle_inbound(&payload);
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(frame = ?frame, "Remote closed the connection");
                            break StreamError::ConnectionClosed;
                        }
                        // Pings are answered by tungstenite itself.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            break StreamError::ConnectionFailed(e.to_string());
                        }
                        None => break StreamError::ConnectionClosed,
                    }
                }
            }
        };
        tracing::warn!(error = %reason, "Connection lost");
        shared.on_connection_lost(generation);
    }

    /// Decode one inbound text payload and broadcast it.
    ///
    /// A malformed payload is dropped per-message; the sequence continues.
    fn handle_inbound(&self, payload: &str) {
        match PredictionMessage::parse(payload) {
            Some(message) => {
                self.messages_received.fetch_add(1, Ordering::Relaxed);
                // Send fails only when no subscriber exists; that is fine.
                let _ = self.predictions_tx.send(message);
            }
            None => {
                self.decode_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Terminal-event handler: transition to Disconnected and schedule a
    /// reconnect, unless disposed or superseded by a newer connection.
    fn on_connection_lost(self: &Arc<Self>, generation: u64) {
        if self.disposed.is_cancelled() {
            return;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer connect() superseded this connection.
            return;
        }
        self.teardown_connection();
        self.state_tx.send_replace(ConnectionState::Disconnected);
        self.schedule_reconnect();
    }

    /// Cancel the current connection's tasks and drop its writer handle.
    fn teardown_connection(&self) {
        if let Ok(mut guard) = self.conn_cancel.lock() {
            if let Some(cancel) = guard.take() {
                cancel.cancel();
            }
        }
        if let Ok(mut guard) = self.outbound.lock() {
            *guard = None;
        }
    }

    /// Schedule a single reconnect attempt after the current back-off delay.
    ///
    /// Single-flight: if a timer is already pending this is a no-op, so
    /// overlapping terminal events never accumulate duplicate timers.
    fn schedule_reconnect(self: &Arc<Self>) {
        if self.disposed.is_cancelled() {
            return;
        }
        if self.reconnect_pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let delay = match self.backoff.lock() {
            Ok(mut backoff) => backoff.next_delay(),
            Err(_) => Duration::from_secs(defaults::BACKOFF_CEILING_SECS),
        };
        tracing::warn!(delay_secs = delay.as_secs(), "Scheduling reconnect");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = shared.disposed.cancelled() => {
                    shared.reconnect_pending.store(false, Ordering::SeqCst);
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            shared.reconnect_pending.store(false, Ordering::SeqCst);
            // Re-check the dispose flag before acting: a dispose that
            // landed during the sleep must win.
            if shared.disposed.is_cancelled() {
                return;
            }
            Self::connect(shared, true).await;
        });
    }
}
