use std::future::Future;

use roomshare_protocol::Frame;

use crate::TransferError;

/// Outbound half of a room connection, as seen by the [`Sender`](crate::Sender).
///
/// Implementations map any transport failure to
/// [`TransferError::ConnectionLost`].
pub trait FrameSink {
    /// Sends one text frame.
    fn send_text(
        &mut self,
        text: String,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;

    /// Sends a `file_chunk` text frame and its binary payload back to back.
    ///
    /// No other frame may be written between the two.
    fn send_chunk(
        &mut self,
        meta: String,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;
}

/// Records frames in memory. Used by tests and loopback tooling.
impl FrameSink for Vec<Frame> {
    async fn send_text(&mut self, text: String) -> Result<(), TransferError> {
        self.push(Frame::Text(text));
        Ok(())
    }

    async fn send_chunk(&mut self, meta: String, payload: Vec<u8>) -> Result<(), TransferError> {
        self.push(Frame::Text(meta));
        self.push(Frame::Binary(payload));
        Ok(())
    }
}
