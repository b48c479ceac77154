use std::path::Path;

use tokio_util::io::ReaderStream;

use roomshare_protocol::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_FILENAME};

use crate::TransferError;

/// Read buffer used when streaming a file from disk.
const READ_BLOCK_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Chunker
// ---------------------------------------------------------------------------

/// Re-slices arbitrary byte blocks into fixed-size chunks.
///
/// Chunk boundaries depend only on the byte offset, never on how the
/// source happened to split its reads: a short block is carried over
/// and completed by the next one.
pub struct Chunker {
    chunk_size: usize,
    pending: Vec<u8>,
}

impl Chunker {
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            chunk_size,
            pending: Vec::new(),
        }
    }

    /// Feeds a block and returns every chunk it completes.
    pub fn push(&mut self, mut block: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();

        if !self.pending.is_empty() {
            let take = (self.chunk_size - self.pending.len()).min(block.len());
            self.pending.extend_from_slice(&block[..take]);
            block = &block[take..];
            if self.pending.len() == self.chunk_size {
                out.push(std::mem::take(&mut self.pending));
            }
        }

        while block.len() >= self.chunk_size {
            let (chunk, rest) = block.split_at(self.chunk_size);
            out.push(chunk.to_vec());
            block = rest;
        }

        if !block.is_empty() {
            self.pending.extend_from_slice(block);
        }
        out
    }

    /// Returns the trailing partial chunk, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

// ---------------------------------------------------------------------------
// OutgoingFile
// ---------------------------------------------------------------------------

/// Name and size announced in `file_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFile {
    pub filename: String,
    pub size: u64,
}

impl OutgoingFile {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
        }
    }

    /// Opens `path` for sending and returns its metadata plus a lazy
    /// stream of byte blocks.
    ///
    /// The stream is single-use: a new send must open the file again.
    pub async fn open(
        path: &Path,
    ) -> Result<(Self, ReaderStream<tokio::fs::File>), TransferError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(TransferError::SourceRead)?;
        let metadata = file.metadata().await.map_err(TransferError::SourceRead)?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidPath(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        Ok((
            Self::new(filename, metadata.len()),
            ReaderStream::with_capacity(file, READ_BLOCK_SIZE),
        ))
    }
}
