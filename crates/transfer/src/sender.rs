//! Outbound half of the transfer protocol.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use roomshare_protocol::ControlMessage;

use crate::TransferError;
use crate::chunked::{Chunker, OutgoingFile};
use crate::sink::FrameSink;
use crate::types::{OutgoingTransfer, SendOptions, SendProgress, SendSummary};

/// Sends files over one connection, one at a time.
///
/// Starting a second send while one is running fails with
/// [`TransferError::TransferConflict`].
pub struct Sender {
    options: SendOptions,
    active: AtomicBool,
    progress: watch::Sender<u8>,
}

/// Clears the active flag and resets observable progress on every exit path.
struct ActiveGuard<'a> {
    sender: &'a Sender,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.sender.progress.send_replace(0);
        self.sender.active.store(false, Ordering::Release);
    }
}

impl Sender {
    pub fn new(options: SendOptions) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            options,
            active: AtomicBool::new(false),
            progress,
        }
    }

    /// Returns `true` while a send is in flight.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Subscribes to the current send percentage (0 when idle).
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Sends one file.
    ///
    /// Emits `file_info`, then a `file_chunk` + binary pair per chunk,
    /// then `file_complete`. A progress report is delivered to
    /// `progress_tx` after each chunk, waiting for room in the channel; a
    /// dropped receiver only stops the reports.
    /// On failure nothing further is emitted; in particular no
    /// `file_complete` is synthesized.
    pub async fn send<S, B, K>(
        &self,
        file: OutgoingFile,
        mut source: S,
        sink: &mut K,
        progress_tx: mpsc::Sender<SendProgress>,
    ) -> Result<SendSummary, TransferError>
    where
        S: Stream<Item = io::Result<B>> + Unpin,
        B: AsRef<[u8]>,
        K: FrameSink,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(filename = %file.filename, "send rejected: another send is active");
            return Err(TransferError::TransferConflict);
        }
        let _guard = ActiveGuard { sender: self };

        let started = Instant::now();
        let mut transfer =
            OutgoingTransfer::new(file.filename, file.size, self.options.chunk_size);
        info!(
            filename = %transfer.filename,
            size = transfer.total_size,
            chunk_size = transfer.chunk_size,
            "sending file"
        );

        let info_frame = ControlMessage::file_info(&transfer.filename, transfer.total_size);
        sink.send_text(info_frame.encode()?).await?;

        if transfer.total_size == 0 {
            self.report(&transfer, None, &progress_tx).await;
        }

        let mut chunker = Chunker::new(transfer.chunk_size);
        while let Some(block) = source.next().await {
            let block = block.map_err(TransferError::SourceRead)?;
            for chunk in chunker.push(block.as_ref()) {
                self.emit_chunk(&mut transfer, chunk, sink, &progress_tx)
                    .await?;
            }
        }
        if let Some(tail) = chunker.finish() {
            self.emit_chunk(&mut transfer, tail, sink, &progress_tx)
                .await?;
        }

        if transfer.bytes_sent < transfer.total_size {
            warn!(
                filename = %transfer.filename,
                declared = transfer.total_size,
                sent = transfer.bytes_sent,
                "source ended early"
            );
        }

        let complete = ControlMessage::FileComplete {
            total_chunks: transfer.next_chunk_index,
            total_size: transfer.bytes_sent,
        };
        sink.send_text(complete.encode()?).await?;

        let summary = SendSummary {
            filename: transfer.filename,
            total_chunks: transfer.next_chunk_index,
            total_size: transfer.bytes_sent,
            elapsed: started.elapsed(),
        };
        info!(
            filename = %summary.filename,
            chunks = summary.total_chunks,
            bytes = summary.total_size,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "file sent"
        );
        Ok(summary)
    }

    async fn emit_chunk<K: FrameSink>(
        &self,
        transfer: &mut OutgoingTransfer,
        chunk: Vec<u8>,
        sink: &mut K,
        progress_tx: &mpsc::Sender<SendProgress>,
    ) -> Result<(), TransferError> {
        let len = chunk.len() as u64;
        let read = transfer.bytes_sent + len;
        if read > transfer.total_size {
            return Err(TransferError::SourceOverrun {
                declared: transfer.total_size,
                read,
            });
        }

        let meta = ControlMessage::ChunkInfo {
            chunk_index: transfer.next_chunk_index,
            size: len,
        };
        sink.send_chunk(meta.encode()?, chunk).await?;

        let index = transfer.record_chunk(len);
        debug!(chunk_index = index, size = len, "chunk sent");
        self.report(transfer, Some(index), progress_tx).await;

        if !self.options.chunk_delay.is_zero() {
            tokio::time::sleep(self.options.chunk_delay).await;
        }
        Ok(())
    }

    async fn report(
        &self,
        transfer: &OutgoingTransfer,
        chunk_index: Option<u64>,
        progress_tx: &mpsc::Sender<SendProgress>,
    ) {
        let percent = transfer.percent();
        self.progress.send_replace(percent);
        let report = SendProgress {
            chunk_index,
            bytes_sent: transfer.bytes_sent,
            total_size: transfer.total_size,
            percent,
        };
        if progress_tx.send(report).await.is_err() {
            trace!(percent, "progress receiver dropped");
        }
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::new(SendOptions::default())
    }
}
