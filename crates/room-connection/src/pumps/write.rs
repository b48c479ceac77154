//! WebSocket write pump: serialises outbound frames.

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::types::Outbound;

/// Writes queued items to the WebSocket until cancelled, the queue
/// closes, a write fails, or a close frame has been written.
///
/// The pump is the only writer, so the two frames of an
/// [`Outbound::Chunk`] are always adjacent on the wire.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
) where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    // Cleared once a close frame is written or the sink has failed.
    let mut send_close = true;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            item = write_rx.recv() => {
                let Some(item) = item else { break };
                let is_close = matches!(
                    item,
                    Outbound::Control(tungstenite::Message::Close(_))
                );
                if let Err(e) = write_item(&mut write, item).await {
                    error!("WebSocket write error: {e}");
                    send_close = false;
                    break;
                }
                if is_close {
                    debug!("close frame written");
                    send_close = false;
                    break;
                }
            }
        }
    }

    // Fail any further sends right away.
    write_rx.close();
    if send_close {
        let _ = write.send(tungstenite::Message::Close(None)).await;
    }
}

async fn write_item<S>(write: &mut S, item: Outbound) -> Result<(), tungstenite::Error>
where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    match item {
        Outbound::Text(text) => write.send(tungstenite::Message::Text(text.into())).await,
        Outbound::Chunk { meta, payload } => {
            write.feed(tungstenite::Message::Text(meta.into())).await?;
            write
                .send(tungstenite::Message::Binary(payload.into()))
                .await
        }
        Outbound::Control(msg) => write.send(msg).await,
    }
}
