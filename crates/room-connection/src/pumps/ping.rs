//! WebSocket ping pump: periodic keepalive pings.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use crate::types::Outbound;

/// Queues a ping every `period` until cancelled or the write pump is gone.
pub(crate) async fn ping_pump(
    write_tx: mpsc::Sender<Outbound>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // Skip immediate first tick.

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let ping = Outbound::Control(tungstenite::Message::Ping(Vec::new().into()));
                if write_tx.send(ping).await.is_err() {
                    break;
                }
            }
        }
    }
}
