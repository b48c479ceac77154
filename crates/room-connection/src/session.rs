//! Transfer session over one room connection.
//!
//! A [`Session`] owns the connection's single file [`Sender`] and runs a
//! dispatch task that feeds every inbound frame to the connection's
//! single [`Receiver`]. Sending and receiving progress independently.

use std::path::Path;

use futures_util::Stream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use roomshare_protocol::ControlMessage;
use roomshare_transfer::{
    CompletionPolicy, OutgoingFile, Receiver, ReceiverEvent, SendOptions, SendProgress,
    SendSummary, Sender, TransferError,
};

use crate::error::ConnectionError;
use crate::types::{ConnectionConfig, ConnectionEvent, ReceiveStatus, SessionEvent};
use crate::ws_client::RoomConnection;

/// Transfer settings for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub send: SendOptions,
    pub completion: CompletionPolicy,
    /// Capacity of the [`SessionEvent`] channel.
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            send: SendOptions::default(),
            completion: CompletionPolicy::default(),
            event_capacity: 64,
        }
    }
}

pub struct Session {
    connection: RoomConnection,
    sender: Sender,
    status_rx: watch::Receiver<ReceiveStatus>,
    dispatch: JoinHandle<()>,
}

impl Session {
    /// Joins a room and starts a session on it.
    pub async fn join(
        server: &str,
        code: &str,
        config: &ConnectionConfig,
        options: SessionOptions,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), ConnectionError> {
        let (connection, events) = RoomConnection::open(server, code, config).await?;
        Ok(Self::start(connection, events, options))
    }

    /// Starts a session on an open connection and its event stream.
    pub fn start(
        connection: RoomConnection,
        events: mpsc::Receiver<ConnectionEvent>,
        options: SessionOptions,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (session_tx, session_rx) = mpsc::channel(options.event_capacity);
        let (status_tx, status_rx) = watch::channel(ReceiveStatus::default());
        let receiver = Receiver::new(options.completion);

        let dispatch = tokio::spawn(dispatch_loop(events, receiver, session_tx, status_tx));

        let session = Self {
            connection,
            sender: Sender::new(options.send),
            status_rx,
            dispatch,
        };
        (session, session_rx)
    }

    pub fn room(&self) -> &str {
        self.connection.room()
    }

    /// Sends a chat line stamped with the current time.
    pub async fn send_chat(&self, message: &str) -> Result<(), ConnectionError> {
        let text = ControlMessage::chat(message)
            .encode()
            .map_err(TransferError::from)?;
        self.connection.send_text(text).await
    }

    /// Sends a file from disk.
    ///
    /// Fails with [`TransferError::TransferConflict`] while another send
    /// is running on this session.
    pub async fn send_file(
        &self,
        path: &Path,
        progress_tx: mpsc::Sender<SendProgress>,
    ) -> Result<SendSummary, ConnectionError> {
        let (file, source) = OutgoingFile::open(path).await?;
        self.send_stream(file, source, progress_tx).await
    }

    /// Sends a file from any block stream.
    pub async fn send_stream<S, B>(
        &self,
        file: OutgoingFile,
        source: S,
        progress_tx: mpsc::Sender<SendProgress>,
    ) -> Result<SendSummary, ConnectionError>
    where
        S: Stream<Item = std::io::Result<B>> + Unpin,
        B: AsRef<[u8]>,
    {
        let mut sink = self.connection.handle();
        Ok(self.sender.send(file, source, &mut sink, progress_tx).await?)
    }

    /// Subscribes to the inbound transfer status.
    pub fn receive_status(&self) -> watch::Receiver<ReceiveStatus> {
        self.status_rx.clone()
    }

    /// Subscribes to the outbound send percentage.
    pub fn send_progress(&self) -> watch::Receiver<u8> {
        self.sender.progress()
    }

    pub fn is_sending(&self) -> bool {
        self.sender.is_active()
    }

    /// Flushes queued frames and leaves the room.
    pub async fn close(&self) {
        self.connection.close().await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

async fn dispatch_loop(
    mut events: mpsc::Receiver<ConnectionEvent>,
    mut receiver: Receiver,
    session_tx: mpsc::Sender<SessionEvent>,
    status_tx: watch::Sender<ReceiveStatus>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Frame(frame) => {
                let produced = receiver.handle_frame(frame);
                // Status before the events it describes.
                publish_status(&receiver, &status_tx);
                for ev in produced {
                    if let Some(ev) = session_event(ev) {
                        // Owner may have stopped listening; keep receiving anyway.
                        let _ = session_tx.send(ev).await;
                    }
                }
            }
            ConnectionEvent::Error(reason) => warn!(%reason, "connection error"),
            ConnectionEvent::Closed => break,
        }
    }

    receiver.reset();
    publish_status(&receiver, &status_tx);
    info!("disconnected from room");
    let _ = session_tx.send(SessionEvent::Disconnected).await;
}

fn session_event(event: ReceiverEvent) -> Option<SessionEvent> {
    Some(match event {
        ReceiverEvent::Started { filename, size } => SessionEvent::ReceiveStarted { filename, size },
        ReceiverEvent::Progress {
            received,
            expected,
            percent,
        } => SessionEvent::ReceiveProgress {
            received,
            expected,
            percent,
        },
        ReceiverEvent::FileReady(file) => SessionEvent::FileReceived(file),
        ReceiverEvent::Forward(ControlMessage::PeerCount { count }) => {
            SessionEvent::PeerCount(count)
        }
        ReceiverEvent::Forward(ControlMessage::Chat { message, timestamp }) => {
            SessionEvent::Chat { message, timestamp }
        }
        ReceiverEvent::Forward(ControlMessage::Unrecognized { raw }) => SessionEvent::Text(raw),
        ReceiverEvent::Forward(other) => {
            debug!(?other, "unexpected forwarded message");
            return None;
        }
    })
}

fn publish_status(receiver: &Receiver, status_tx: &watch::Sender<ReceiveStatus>) {
    let status = ReceiveStatus {
        receiving: receiver.is_receiving(),
        filename: receiver.current_file().map(str::to_owned),
        progress: receiver.progress(),
    };
    status_tx.send_if_modified(|current| {
        if *current == status {
            false
        } else {
            *current = status;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use roomshare_protocol::Frame;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::{self, protocol::Role};

    async fn session(
        completion: CompletionPolicy,
    ) -> (
        Session,
        mpsc::Receiver<SessionEvent>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (client_io, server_io) = tokio::io::duplex(1 << 20);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let (conn, events) = RoomConnection::attach("ROOM", client, &ConnectionConfig::default());
        let options = SessionOptions {
            send: SendOptions::new(4, Duration::ZERO),
            completion,
            ..SessionOptions::default()
        };
        let (session, session_events) = Session::start(conn, events, options);
        (session, session_events, server)
    }

    async fn push_text(peer: &mut WebSocketStream<tokio::io::DuplexStream>, msg: ControlMessage) {
        peer.send(tungstenite::Message::Text(msg.encode().unwrap().into()))
            .await
            .unwrap();
    }

    /// Reads frames from the peer side until `file_complete`, skipping pings.
    async fn read_transfer(peer: &mut WebSocketStream<tokio::io::DuplexStream>) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match peer.next().await.unwrap().unwrap() {
                tungstenite::Message::Text(t) => {
                    let done = t.contains("file_complete");
                    frames.push(Frame::Text(t.to_string()));
                    if done {
                        return frames;
                    }
                }
                tungstenite::Message::Binary(b) => frames.push(Frame::Binary(b.to_vec())),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn inbound_chat_peers_and_text_become_events() {
        let (_session, mut events, mut peer) = session(CompletionPolicy::default()).await;

        push_text(&mut peer, ControlMessage::PeerCount { count: 2 }).await;
        push_text(
            &mut peer,
            ControlMessage::Chat {
                message: "hi".into(),
                timestamp: 7,
            },
        )
        .await;
        push_text(&mut peer, ControlMessage::Ping).await;
        peer.send(tungstenite::Message::Text("free text".into()))
            .await
            .unwrap();

        assert_eq!(events.recv().await, Some(SessionEvent::PeerCount(2)));
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Chat {
                message: "hi".into(),
                timestamp: 7,
            })
        );
        assert_eq!(events.recv().await, Some(SessionEvent::Text("free text".into())));
    }

    #[tokio::test]
    async fn inbound_file_is_assembled() {
        let (session, mut events, mut peer) = session(CompletionPolicy::default()).await;
        let mut status = session.receive_status();

        push_text(&mut peer, ControlMessage::file_info("notes.txt", 6)).await;
        peer.send(tungstenite::Message::Binary(b"abc".to_vec().into()))
            .await
            .unwrap();
        peer.send(tungstenite::Message::Binary(b"def".to_vec().into()))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(SessionEvent::ReceiveStarted {
                filename: "notes.txt".into(),
                size: 6,
            })
        );
        let mut file = None;
        while let Some(ev) = events.recv().await {
            if let SessionEvent::FileReceived(f) = ev {
                file = Some(f);
                break;
            }
        }
        let file = file.expect("file received");
        assert_eq!(file.filename, "notes.txt");
        assert_eq!(file.bytes, b"abcdef");

        status
            .wait_for(|s| !s.receiving && s.progress == 0)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn status_matches_when_receive_events_arrive() {
        let (session, mut events, mut peer) = session(CompletionPolicy::default()).await;
        let status = session.receive_status();

        push_text(&mut peer, ControlMessage::file_info("pic.png", 4)).await;
        peer.send(tungstenite::Message::Binary(b"\x89PNG".to_vec().into()))
            .await
            .unwrap();

        loop {
            match events.recv().await.expect("event stream open") {
                SessionEvent::ReceiveStarted { .. } => {
                    let now = status.borrow().clone();
                    assert!(now.receiving || now == ReceiveStatus::default());
                }
                SessionEvent::FileReceived(file) => {
                    assert_eq!(file.bytes, b"\x89PNG");
                    assert_eq!(*status.borrow(), ReceiveStatus::default());
                    break;
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn send_file_emits_protocol_frames() {
        let (session, _events, mut peer) = session(CompletionPolicy::default()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let (tx, mut progress) = mpsc::channel(16);
        let summary = session.send_file(&path, tx).await.unwrap();
        assert_eq!(summary.total_chunks, 3);
        assert_eq!(summary.total_size, 10);
        assert!(!session.is_sending());
        assert_eq!(*session.send_progress().borrow(), 0);

        let mut last = 0;
        while let Ok(p) = progress.try_recv() {
            last = p.percent;
        }
        assert_eq!(last, 100);

        let frames = read_transfer(&mut peer).await;
        assert_eq!(frames.len(), 1 + 3 * 2 + 1);
        let mut rx = Receiver::default();
        let ready: Vec<_> = frames
            .into_iter()
            .flat_map(|f| rx.handle_frame(f))
            .filter_map(|e| match e {
                ReceiverEvent::FileReady(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].filename, "data.bin");
        assert_eq!(ready[0].bytes, b"0123456789");
    }

    #[tokio::test]
    async fn send_chat_reaches_peer() {
        let (session, _events, mut peer) = session(CompletionPolicy::default()).await;
        session.send_chat("hello room").await.unwrap();

        let msg = loop {
            match peer.next().await.unwrap().unwrap() {
                tungstenite::Message::Text(t) => break ControlMessage::parse(&t),
                _ => continue,
            }
        };
        let ControlMessage::Chat { message, timestamp } = msg else {
            panic!("expected chat, got {msg:?}");
        };
        assert_eq!(message, "hello room");
        assert!(timestamp > 0);
    }

    #[tokio::test]
    async fn peer_disconnect_resets_partial_receive() {
        let (session, mut events, mut peer) = session(CompletionPolicy::MarkerOnly).await;
        let mut status = session.receive_status();

        push_text(&mut peer, ControlMessage::file_info("big.iso", 100)).await;
        peer.send(tungstenite::Message::Binary(vec![0; 10].into()))
            .await
            .unwrap();
        status.wait_for(|s| s.progress == 10).await.unwrap();
        assert_eq!(status.borrow().filename.as_deref(), Some("big.iso"));

        peer.close(None).await.unwrap();
        loop {
            match events.recv().await {
                Some(SessionEvent::Disconnected) => break,
                Some(_) => continue,
                None => panic!("event stream ended without Disconnected"),
            }
        }
        assert_eq!(*session.receive_status().borrow(), ReceiveStatus::default());
    }

    #[tokio::test]
    async fn send_after_close_is_connection_lost() {
        let (session, _events, _peer) = session(CompletionPolicy::default()).await;
        session.close().await;

        let (tx, _rx) = mpsc::channel(4);
        let result = session
            .send_stream(
                OutgoingFile::new("x", 1),
                futures_util::stream::iter(vec![Ok::<_, std::io::Error>(vec![1u8])]),
                tx,
            )
            .await;
        assert!(matches!(
            result,
            Err(ConnectionError::Transfer(TransferError::ConnectionLost(_)))
        ));
        assert!(!session.is_sending());
    }
}
