//! Room connection for RoomShare peers.
//!
//! Provides the WebSocket client (read/write/ping pumps), the
//! [`Session`] that runs one file sender and one file receiver on top
//! of it, and room code requests against the relay's HTTP API.

mod error;
mod pumps;
pub mod room_code;
pub mod session;
pub mod types;
pub mod ws_client;

pub use error::ConnectionError;
pub use room_code::{api_base, request_room_code};
pub use session::{Session, SessionOptions};
pub use types::{ConnectionConfig, ConnectionEvent, Outbound, ReceiveStatus, SessionEvent};
pub use ws_client::{FrameHandle, RoomConnection, normalize_room_code, room_url};
