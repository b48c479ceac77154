//! Wire protocol for RoomShare peers.
//!
//! Every control message is a JSON text frame with a `type` discriminant.
//! File payload bytes travel in binary frames, each one immediately
//! preceded by its `file_chunk` metadata frame.

pub mod codec;
pub mod constants;
pub mod frame;
pub mod messages;

// Re-export primary types for convenience.
pub use codec::{DecodeFailure, decode, encode};
pub use constants::MessageType;
pub use frame::Frame;
pub use messages::{ControlMessage, now_millis};
