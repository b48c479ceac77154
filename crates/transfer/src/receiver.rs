//! Inbound half of the transfer protocol.

use tracing::{debug, info, warn};

use roomshare_protocol::constants::DEFAULT_FILENAME;
use roomshare_protocol::{ControlMessage, Frame};

use crate::assembler::assemble;
use crate::types::{AssembledFile, CompletionPolicy, IncomingTransfer};

/// Where the receiver is in the file protocol.
#[derive(Debug, Clone, Default)]
enum ReceiveState {
    #[default]
    Idle,
    Receiving(IncomingTransfer),
}

/// Output of feeding one frame to the [`Receiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A `file_info` opened a new transfer.
    Started { filename: String, size: u64 },
    /// A binary fragment arrived for a transfer with a known size.
    Progress {
        received: u64,
        expected: u64,
        percent: u8,
    },
    /// All bytes are in; the receiver is idle again.
    FileReady(AssembledFile),
    /// Not part of the file protocol; hand to the messaging surface.
    Forward(ControlMessage),
}

/// Consumes inbound frames in arrival order and reassembles files.
///
/// Synchronous: the caller owns the receiver and feeds it every frame
/// from one connection. Completion takes the transfer out of the state,
/// assembles it and resets progress within a single call.
#[derive(Debug, Default)]
pub struct Receiver {
    state: ReceiveState,
    policy: CompletionPolicy,
    progress: u8,
}

impl Receiver {
    pub fn new(policy: CompletionPolicy) -> Self {
        Self {
            state: ReceiveState::Idle,
            policy,
            progress: 0,
        }
    }

    /// Current receive percentage; 0 when idle.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_receiving(&self) -> bool {
        matches!(self.state, ReceiveState::Receiving(_))
    }

    /// Name of the file being received, if any.
    pub fn current_file(&self) -> Option<&str> {
        match &self.state {
            ReceiveState::Receiving(t) => Some(&t.expected_filename),
            ReceiveState::Idle => None,
        }
    }

    /// Drops any partial transfer and returns to idle.
    pub fn reset(&mut self) {
        if let ReceiveState::Receiving(t) = &self.state {
            warn!(
                filename = %t.expected_filename,
                received = t.received_size(),
                expected = t.expected_size,
                "discarding partial transfer"
            );
        }
        self.state = ReceiveState::Idle;
        self.progress = 0;
    }

    pub fn handle_frame(&mut self, frame: Frame) -> Vec<ReceiverEvent> {
        match frame {
            Frame::Text(text) => self.handle_text(&text),
            Frame::Binary(data) => self.handle_binary(data),
        }
    }

    pub fn handle_text(&mut self, text: &str) -> Vec<ReceiverEvent> {
        self.handle_message(ControlMessage::parse(text))
    }

    pub fn handle_message(&mut self, msg: ControlMessage) -> Vec<ReceiverEvent> {
        match msg {
            ControlMessage::FileInfo { filename, size, .. } => self.start(filename, size),
            ControlMessage::ChunkInfo { chunk_index, size } => {
                self.announce_chunk(chunk_index, size);
                Vec::new()
            }
            ControlMessage::FileComplete {
                total_chunks,
                total_size,
            } => self.complete(total_chunks, total_size),
            ControlMessage::Ping => {
                tracing::trace!("relay ping");
                Vec::new()
            }
            other @ (ControlMessage::PeerCount { .. }
            | ControlMessage::Chat { .. }
            | ControlMessage::Unrecognized { .. }) => vec![ReceiverEvent::Forward(other)],
        }
    }

    pub fn handle_binary(&mut self, data: Vec<u8>) -> Vec<ReceiverEvent> {
        let ReceiveState::Receiving(transfer) = &mut self.state else {
            warn!(bytes = data.len(), "binary frame outside a transfer dropped");
            return Vec::new();
        };

        let len = data.len() as u64;
        match transfer.announced.take() {
            Some((index, size)) if size != len => warn!(
                chunk_index = index,
                announced = size,
                actual = len,
                "chunk size differs from its metadata"
            ),
            Some((index, _)) => debug!(chunk_index = index, size = len, "chunk received"),
            None => debug!(size = len, "chunk received without metadata"),
        }

        let received = transfer.push_fragment(data);
        let mut events = Vec::new();
        if let Some(percent) = transfer.percent() {
            self.progress = percent;
            events.push(ReceiverEvent::Progress {
                received,
                expected: transfer.expected_size,
                percent,
            });
        }

        if transfer.threshold_reached() {
            match self.policy {
                CompletionPolicy::SizeOrMarker => {
                    if let Some(file) = self.finish() {
                        events.push(ReceiverEvent::FileReady(file));
                    }
                }
                CompletionPolicy::MarkerOnly => {
                    if !transfer.threshold_logged {
                        transfer.threshold_logged = true;
                        info!(
                            filename = %transfer.expected_filename,
                            bytes = received,
                            "announced size reached, waiting for file_complete"
                        );
                    }
                }
            }
        }
        events
    }

    fn start(&mut self, filename: String, size: u64) -> Vec<ReceiverEvent> {
        let filename = if filename.is_empty() {
            DEFAULT_FILENAME.to_string()
        } else {
            filename
        };

        if let ReceiveState::Receiving(prev) = &self.state {
            warn!(
                previous = %prev.expected_filename,
                received = prev.received_size(),
                expected = prev.expected_size,
                "transfer superseded by a new file_info"
            );
        }
        info!(filename = %filename, size, "receiving file");

        self.state = ReceiveState::Receiving(IncomingTransfer::new(filename.clone(), size));
        self.progress = 0;
        vec![ReceiverEvent::Started { filename, size }]
    }

    fn announce_chunk(&mut self, chunk_index: u64, size: u64) {
        let ReceiveState::Receiving(transfer) = &mut self.state else {
            debug!(chunk_index, "file_chunk outside a transfer ignored");
            return;
        };
        if chunk_index != transfer.next_chunk_index {
            warn!(
                expected = transfer.next_chunk_index,
                got = chunk_index,
                "chunk index out of sequence"
            );
        }
        if let Some((index, _)) = transfer.announced {
            warn!(chunk_index = index, "file_chunk metadata without payload");
        }
        transfer.announced = Some((chunk_index, size));
        transfer.next_chunk_index = chunk_index.saturating_add(1);
    }

    fn complete(&mut self, total_chunks: u64, total_size: u64) -> Vec<ReceiverEvent> {
        let ReceiveState::Receiving(transfer) = &self.state else {
            debug!("file_complete while idle ignored");
            return Vec::new();
        };

        if total_size != transfer.received_size()
            || total_chunks != transfer.fragment_count() as u64
        {
            warn!(
                filename = %transfer.expected_filename,
                announced_chunks = total_chunks,
                announced_size = total_size,
                received_chunks = transfer.fragment_count(),
                received_size = transfer.received_size(),
                "file_complete totals differ from what arrived"
            );
        }

        if transfer.fragment_count() == 0 {
            info!(filename = %transfer.expected_filename, "transfer finished with no data");
            self.state = ReceiveState::Idle;
            self.progress = 0;
            return Vec::new();
        }

        self.finish()
            .map(ReceiverEvent::FileReady)
            .into_iter()
            .collect()
    }

    /// Takes the transfer out of the state and assembles it.
    fn finish(&mut self) -> Option<AssembledFile> {
        let ReceiveState::Receiving(transfer) = std::mem::take(&mut self.state) else {
            return None;
        };
        self.progress = 0;

        let filename = transfer.expected_filename.clone();
        let fragments = transfer.fragment_count();
        let bytes = assemble(transfer.into_fragments());
        info!(filename = %filename, bytes = bytes.len(), fragments, "file assembled");

        Some(AssembledFile {
            filename,
            bytes,
            fragments,
        })
    }
}
