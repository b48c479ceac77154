use tokio_tungstenite::tungstenite;

use roomshare_transfer::TransferError;

/// Errors from the room connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay API error: {0}")]
    Api(String),

    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Transfer(#[from] TransferError),
}
