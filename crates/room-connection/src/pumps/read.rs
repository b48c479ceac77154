//! WebSocket read pump: turns incoming messages into [`ConnectionEvent`]s.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use roomshare_protocol::Frame;

use crate::types::{ConnectionEvent, Outbound};

/// Reads messages from the WebSocket and forwards text and binary frames
/// in arrival order.
///
/// Any incoming message resets a deadline of `pong_wait`; if nothing
/// arrives before it expires the transport is considered dead. Always
/// ends by emitting [`ConnectionEvent::Closed`].
pub(crate) async fn read_pump<S>(
    mut read: S,
    events_tx: mpsc::Sender<ConnectionEvent>,
    write_tx: mpsc::Sender<Outbound>,
    pong_wait: Duration,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let pong_deadline = tokio::time::sleep(pong_wait);
    tokio::pin!(pong_deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut pong_deadline => {
                warn!("no traffic within {pong_wait:?}, connection dead");
                let _ = events_tx
                    .send(ConnectionEvent::Error("pong timeout".into()))
                    .await;
                break;
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        let _ = events_tx.send(ConnectionEvent::Error(e.to_string())).await;
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                };
                pong_deadline.as_mut().reset(tokio::time::Instant::now() + pong_wait);

                let frame = match msg {
                    tungstenite::Message::Text(text) => Frame::Text(text.to_string()),
                    tungstenite::Message::Binary(data) => Frame::Binary(data.to_vec()),
                    tungstenite::Message::Ping(data) => {
                        trace!("received ping, sending pong");
                        let pong = Outbound::Control(tungstenite::Message::Pong(data));
                        let _ = write_tx.send(pong).await;
                        continue;
                    }
                    tungstenite::Message::Pong(_) => {
                        trace!("received pong");
                        continue;
                    }
                    tungstenite::Message::Close(frame) => {
                        debug!(?frame, "received close frame");
                        break;
                    }
                    tungstenite::Message::Frame(_) => continue,
                };

                if events_tx.send(ConnectionEvent::Frame(frame)).await.is_err() {
                    debug!("event receiver dropped");
                    break;
                }
            }
        }
    }

    let _ = events_tx.send(ConnectionEvent::Closed).await;
}
