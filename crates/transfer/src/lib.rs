//! Chunked file transfer over a room connection.
//!
//! A [`Sender`] splits one file into fixed-size chunks and emits
//! `file_info`, a `file_chunk` + binary pair per chunk, then
//! `file_complete`. A [`Receiver`] consumes the same frames, tracks
//! progress, and hands the reassembled bytes out as an [`AssembledFile`].

mod assembler;
mod chunked;
mod download;
mod progress;
mod receiver;
mod sender;
mod sink;
mod types;
mod validation;

pub use assembler::assemble;
pub use chunked::{Chunker, OutgoingFile};
pub use download::write_assembled_file;
pub use progress::{SpeedCalculator, format_megabytes, percent};
pub use receiver::{Receiver, ReceiverEvent};
pub use sender::Sender;
pub use sink::FrameSink;
pub use types::{
    AssembledFile, CompletionPolicy, IncomingTransfer, OutgoingTransfer, SendOptions,
    SendProgress, SendSummary,
};
pub use validation::{DEFAULT_SAVE_NAME, sanitize_filename};

pub use roomshare_protocol::constants::{DEFAULT_CHUNK_DELAY, DEFAULT_CHUNK_SIZE};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("failed to read source: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error("source produced {read} bytes, more than the declared {declared}")]
    SourceOverrun { declared: u64, read: u64 },

    #[error("a transfer is already active in this direction")]
    TransferConflict,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode control message: {0}")]
    Encode(#[from] serde_json::Error),
}
