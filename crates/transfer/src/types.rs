use std::time::Duration;

use serde::{Deserialize, Serialize};

use roomshare_protocol::constants::{DEFAULT_CHUNK_DELAY, DEFAULT_CHUNK_SIZE};

use crate::progress::percent;

/// Sender tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Maximum bytes per chunk.
    pub chunk_size: usize,
    /// Pause after every chunk.
    pub chunk_delay: Duration,
}

impl SendOptions {
    /// Creates options; a `chunk_size` of 0 falls back to [`DEFAULT_CHUNK_SIZE`].
    pub fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            chunk_size,
            chunk_delay,
        }
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_DELAY)
    }
}

/// When the receiver considers a file complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Assemble on `file_complete` or as soon as the announced size has
    /// arrived, whichever comes first.
    #[default]
    SizeOrMarker,
    /// Assemble only on `file_complete`; reaching the announced size is
    /// logged but does not finish the transfer.
    MarkerOnly,
}

/// State of one outbound file, owned by the sender for the duration of a send.
#[derive(Debug, Clone)]
pub struct OutgoingTransfer {
    pub filename: String,
    pub total_size: u64,
    pub chunk_size: usize,
    pub next_chunk_index: u64,
    pub bytes_sent: u64,
}

impl OutgoingTransfer {
    pub fn new(filename: impl Into<String>, total_size: u64, chunk_size: usize) -> Self {
        Self {
            filename: filename.into(),
            total_size,
            chunk_size,
            next_chunk_index: 0,
            bytes_sent: 0,
        }
    }

    /// Records a sent chunk and returns its index.
    pub fn record_chunk(&mut self, len: u64) -> u64 {
        let index = self.next_chunk_index;
        self.next_chunk_index += 1;
        self.bytes_sent += len;
        index
    }

    /// Rounded percentage of bytes sent (100 for an empty file).
    pub fn percent(&self) -> u8 {
        percent(self.bytes_sent, self.total_size)
    }
}

/// State of one inbound file, owned by the receiver.
#[derive(Debug, Clone)]
pub struct IncomingTransfer {
    pub expected_filename: String,
    pub expected_size: u64,
    fragments: Vec<Vec<u8>>,
    received_size: u64,
    /// Last `file_chunk` metadata still waiting for its payload.
    pub(crate) announced: Option<(u64, u64)>,
    pub(crate) next_chunk_index: u64,
    pub(crate) threshold_logged: bool,
}

impl IncomingTransfer {
    pub fn new(expected_filename: impl Into<String>, expected_size: u64) -> Self {
        Self {
            expected_filename: expected_filename.into(),
            expected_size,
            fragments: Vec::new(),
            received_size: 0,
            announced: None,
            next_chunk_index: 0,
            threshold_logged: false,
        }
    }

    /// Appends a binary fragment and returns the new received total.
    pub fn push_fragment(&mut self, data: Vec<u8>) -> u64 {
        self.received_size += data.len() as u64;
        self.fragments.push(data);
        self.received_size
    }

    pub fn received_size(&self) -> u64 {
        self.received_size
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Rounded percentage received, clamped to 100.
    ///
    /// `None` when the announced size is 0.
    pub fn percent(&self) -> Option<u8> {
        (self.expected_size > 0).then(|| percent(self.received_size, self.expected_size))
    }

    /// `true` once at least the announced size has arrived.
    pub fn threshold_reached(&self) -> bool {
        self.expected_size > 0 && self.received_size >= self.expected_size
    }

    pub(crate) fn into_fragments(self) -> Vec<Vec<u8>> {
        self.fragments
    }
}

/// Progress report emitted after every chunk is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendProgress {
    /// Index of the chunk just sent (`None` for an empty file).
    pub chunk_index: Option<u64>,
    pub bytes_sent: u64,
    pub total_size: u64,
    pub percent: u8,
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSummary {
    pub filename: String,
    pub total_chunks: u64,
    pub total_size: u64,
    pub elapsed: Duration,
}

/// A fully received file, ready for the download sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Number of binary fragments it was assembled from.
    pub fragments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_options_zero_chunk_size_uses_default() {
        let opts = SendOptions::new(0, Duration::ZERO);
        assert_eq!(opts.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn outgoing_transfer_indices_increase_by_one() {
        let mut t = OutgoingTransfer::new("a.bin", 10, 4);
        assert_eq!(t.record_chunk(4), 0);
        assert_eq!(t.record_chunk(4), 1);
        assert_eq!(t.record_chunk(2), 2);
        assert_eq!(t.next_chunk_index, 3);
        assert_eq!(t.bytes_sent, 10);
        assert_eq!(t.percent(), 100);
    }

    #[test]
    fn empty_outgoing_transfer_is_complete() {
        let t = OutgoingTransfer::new("empty", 0, 4);
        assert_eq!(t.percent(), 100);
    }

    #[test]
    fn incoming_transfer_tracks_sum_of_fragments() {
        let mut t = IncomingTransfer::new("f", 100);
        assert_eq!(t.percent(), Some(0));
        assert_eq!(t.push_fragment(vec![0; 60]), 60);
        assert_eq!(t.percent(), Some(60));
        assert!(!t.threshold_reached());
        assert_eq!(t.push_fragment(vec![0; 40]), 100);
        assert_eq!(t.fragment_count(), 2);
        assert!(t.threshold_reached());
        assert_eq!(t.percent(), Some(100));
    }

    #[test]
    fn incoming_transfer_zero_size_has_no_percent() {
        let mut t = IncomingTransfer::new("f", 0);
        t.push_fragment(vec![1, 2, 3]);
        assert_eq!(t.percent(), None);
        assert!(!t.threshold_reached());
    }

    #[test]
    fn completion_policy_serde_names() {
        let p: CompletionPolicy = serde_json::from_str("\"marker_only\"").unwrap();
        assert_eq!(p, CompletionPolicy::MarkerOnly);
        assert_eq!(
            serde_json::to_string(&CompletionPolicy::SizeOrMarker).unwrap(),
            "\"size_or_marker\""
        );
    }
}
