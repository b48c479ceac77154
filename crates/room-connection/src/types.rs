//! Public types for the room connection.

use std::time::Duration;

use tokio_tungstenite::tungstenite;

use roomshare_protocol::Frame;
use roomshare_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_PING_PERIOD, WS_PONG_WAIT};
use roomshare_transfer::AssembledFile;

/// Transport settings for a [`RoomConnection`](crate::RoomConnection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Largest accepted WebSocket message or frame.
    pub max_message_size: usize,
    /// Interval between keepalive pings.
    pub ping_period: Duration,
    /// Silence after which the transport is considered dead.
    pub pong_wait: Duration,
    /// Capacity of the outbound and inbound queues.
    pub queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_size: WS_MAX_MESSAGE_SIZE,
            ping_period: WS_PING_PERIOD,
            pong_wait: WS_PONG_WAIT,
            queue_capacity: 256,
        }
    }
}

/// One item on the write queue.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A text frame.
    Text(String),
    /// A `file_chunk` text frame and its binary payload, written back to back.
    Chunk { meta: String, payload: Vec<u8> },
    /// A transport-level frame (ping, pong, close).
    Control(tungstenite::Message),
}

/// What the read pump reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A text or binary frame from the room.
    Frame(Frame),
    /// The transport failed.
    Error(String),
    /// The connection is gone; no further events follow.
    Closed,
}

/// What a [`Session`](crate::Session) reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Number of peers in the room, including this one.
    PeerCount(u64),
    Chat { message: String, timestamp: u64 },
    /// Freeform text a peer sent that is not a known message.
    Text(String),
    ReceiveStarted { filename: String, size: u64 },
    ReceiveProgress {
        received: u64,
        expected: u64,
        percent: u8,
    },
    FileReceived(AssembledFile),
    Disconnected,
}

/// Snapshot of the inbound transfer, published on a watch channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveStatus {
    pub receiving: bool,
    pub filename: Option<String>,
    pub progress: u8,
}
