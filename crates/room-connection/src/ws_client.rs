//! WebSocket client for joining a room on the relay.
//!
//! One connection carries text and binary frames in both directions.
//! Writes go through a single queue drained by the write pump; reads are
//! delivered as [`ConnectionEvent`]s on an mpsc channel.

use std::time::Duration;

use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use roomshare_protocol::constants::ROOM_PATH_PREFIX;
use roomshare_transfer::{FrameSink, TransferError};

use crate::error::ConnectionError;
use crate::types::{ConnectionConfig, ConnectionEvent, Outbound};

/// How long [`RoomConnection::close`] waits for queued frames to drain.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Trims and uppercases a room code; it must be non-empty ASCII alphanumeric.
pub fn normalize_room_code(code: &str) -> Result<String, ConnectionError> {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConnectionError::InvalidRoomCode(code));
    }
    Ok(code)
}

/// Builds the room endpoint URL: `{server}/ws/{CODE}`.
pub fn room_url(server: &str, code: &str) -> Result<String, ConnectionError> {
    let code = normalize_room_code(code)?;
    let server = server.trim().trim_end_matches('/');
    Ok(format!("{server}{ROOM_PATH_PREFIX}{code}"))
}

/// Installs ring as the process-wide rustls provider for `wss://` rooms.
fn install_tls_provider() {
    // Errs only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// A joined room.
///
/// Dropping the connection aborts its pumps immediately; call
/// [`RoomConnection::close`] first to flush queued frames.
pub struct RoomConnection {
    room: String,
    write_tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    read_handle: JoinHandle<()>,
    write_handle: JoinHandle<()>,
    ping_handle: JoinHandle<()>,
}

impl RoomConnection {
    /// Connects to `{server}/ws/{code}` and starts the pumps.
    pub async fn open(
        server: &str,
        code: &str,
        config: &ConnectionConfig,
    ) -> Result<(Self, mpsc::Receiver<ConnectionEvent>), ConnectionError> {
        let room = normalize_room_code(code)?;
        let url = room_url(server, &room)?;
        if url.starts_with("wss://") {
            install_tls_provider();
        }

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(config.max_message_size);
        ws_config.max_frame_size = Some(config.max_message_size);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url.as_str(), Some(ws_config), false)
                .await?;
        info!(room = %room, url = %url, "joined room");

        Ok(Self::attach(room, ws_stream, config))
    }

    /// Starts the pumps on an already-established WebSocket.
    pub fn attach<S>(
        room: impl Into<String>,
        ws_stream: S,
        config: &ConnectionConfig,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>)
    where
        S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
            + Sink<tungstenite::Message, Error = tungstenite::Error>
            + Send
            + 'static,
    {
        let (write, read) = ws_stream.split();
        let (write_tx, write_rx) = mpsc::channel::<Outbound>(config.queue_capacity);
        let (events_tx, events_rx) = mpsc::channel::<ConnectionEvent>(config.queue_capacity);
        let cancel = CancellationToken::new();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read,
                events_tx,
                write_tx,
                config.pong_wait,
                cancel,
            ))
        };

        let ping_handle = {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::ping::ping_pump(
                write_tx,
                config.ping_period,
                cancel,
            ))
        };

        let connection = Self {
            room: room.into(),
            write_tx,
            cancel,
            read_handle,
            write_handle,
            ping_handle,
        };
        (connection, events_rx)
    }

    /// Normalized room code.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Returns a cloneable writer for this connection.
    pub fn handle(&self) -> FrameHandle {
        FrameHandle {
            write_tx: self.write_tx.clone(),
        }
    }

    /// Queues a text frame.
    pub async fn send_text(&self, text: String) -> Result<(), ConnectionError> {
        self.write_tx
            .send(Outbound::Text(text))
            .await
            .map_err(|_| ConnectionError::Closed)
    }

    /// Returns `true` once the write pump has stopped.
    pub fn is_closed(&self) -> bool {
        self.write_tx.is_closed()
    }

    /// Sends a close frame after everything already queued, waits for the
    /// write pump to finish, then stops the pumps.
    pub async fn close(&self) {
        let close = Outbound::Control(tungstenite::Message::Close(None));
        if self.write_tx.send(close).await.is_ok()
            && tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, self.write_tx.closed())
                .await
                .is_err()
        {
            debug!(room = %self.room, "write queue did not drain before close");
        }
        self.cancel.cancel();
    }
}

impl Drop for RoomConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        self.write_handle.abort();
        self.ping_handle.abort();
    }
}

/// Cloneable writer for a [`RoomConnection`].
///
/// Once the write pump has stopped every send fails with
/// [`TransferError::ConnectionLost`].
#[derive(Debug, Clone)]
pub struct FrameHandle {
    write_tx: mpsc::Sender<Outbound>,
}

impl FrameHandle {
    pub async fn send(&self, item: Outbound) -> Result<(), TransferError> {
        self.write_tx
            .send(item)
            .await
            .map_err(|_| TransferError::ConnectionLost("write pump stopped".into()))
    }
}

impl FrameSink for FrameHandle {
    async fn send_text(&mut self, text: String) -> Result<(), TransferError> {
        self.send(Outbound::Text(text)).await
    }

    async fn send_chunk(&mut self, meta: String, payload: Vec<u8>) -> Result<(), TransferError> {
        self.send(Outbound::Chunk { meta, payload }).await
    }
}
