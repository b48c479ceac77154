use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default size of one file chunk (64 KiB).
///
/// This is a sender-side knob, not a protocol constant: receivers must
/// accept chunks of any size.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default pause between two chunks.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(10);

/// Filename used when a peer announces a file without a name.
pub const DEFAULT_FILENAME: &str = "unknown_file";

/// Path prefix of the relay's room endpoint (`{server}/ws/{ROOM}`).
pub const ROOM_PATH_PREFIX: &str = "/ws/";

/// Maximum message size in bytes (16 MiB).
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// How often to send WebSocket pings.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(20);

/// Time to wait for a pong (or any incoming message) before the
/// transport is considered dead.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// Text-frame type discriminant (the `type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "peers")]
    Peers,
    #[serde(rename = "file_info")]
    FileInfo,
    #[serde(rename = "file_chunk")]
    FileChunk,
    #[serde(rename = "file_complete")]
    FileComplete,
    #[serde(rename = "chat")]
    Chat,
    /// Idle keepalive sent by the relay.
    #[serde(rename = "ping")]
    Ping,

    /// Any tag this client does not know.
    #[serde(other)]
    Unknown,
}

impl MessageType {
    /// Wire name of the discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Peers => "peers",
            MessageType::FileInfo => "file_info",
            MessageType::FileChunk => "file_chunk",
            MessageType::FileComplete => "file_complete",
            MessageType::Chat => "chat",
            MessageType::Ping => "ping",
            MessageType::Unknown => "unknown",
        }
    }
}
