//! Application orchestrator: runs the `new`, `join` and `send` commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use roomshare_connection::{ConnectionConfig, Session, SessionEvent, request_room_code};
use roomshare_transfer::{SendProgress, SendSummary, format_megabytes, write_assembled_file};

use crate::cli::Command;
use crate::config::Config;
use crate::display::{ProgressLine, event_line};

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Empty,
    Quit,
    Send(PathBuf),
    Chat(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if trimmed == "/quit" || trimmed == "/exit" {
        return Input::Quit;
    }
    if let Some(path) = trimmed.strip_prefix("/send ") {
        let path = path.trim();
        if !path.is_empty() {
            return Input::Send(PathBuf::from(path));
        }
    }
    Input::Chat(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Runs one command until it finishes or the user quits.
pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::New => {
            let code = request_room_code(&config.server_url).await?;
            println!("{code}");
            Ok(())
        }
        Command::Join { room } => join(&room, &config).await,
        Command::Send { room, file } => send_once(&room, &file, &config).await,
    }
}

async fn open_session(
    room: &str,
    config: &Config,
) -> anyhow::Result<(Session, mpsc::Receiver<SessionEvent>)> {
    let (session, events) = Session::join(
        &config.server_url,
        room,
        &ConnectionConfig::default(),
        config.session_options(),
    )
    .await?;
    tracing::info!(room = %session.room(), server = %config.server_url, "session started");
    Ok((session, events))
}

/// Interactive chat; `/send <path>` shares a file, `/quit` leaves.
async fn join(room: &str, config: &Config) -> anyhow::Result<()> {
    let (session, mut events) = open_session(room, config).await?;
    let session = Arc::new(session);
    println!(
        "* joined room {}. Type to chat, /send <path> to share a file, /quit to leave.",
        session.room()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut receive_line: Option<ProgressLine> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let disconnected = event == SessionEvent::Disconnected;
                on_event(event, &mut receive_line, &config.download_dir).await;
                if disconnected {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Send(path) => spawn_send(Arc::clone(&session), path),
                    Input::Chat(message) => {
                        if let Err(e) = session.send_chat(&message).await {
                            println!("* chat not sent: {e}");
                            break;
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, leaving room");
                break;
            }
        }
    }

    session.close().await;
    Ok(())
}

async fn on_event(event: SessionEvent, receive_line: &mut Option<ProgressLine>, dir: &Path) {
    match event {
        SessionEvent::ReceiveStarted { ref filename, .. } => {
            *receive_line = Some(ProgressLine::new(format!("receiving {filename}")));
        }
        SessionEvent::ReceiveProgress {
            received,
            expected,
            percent,
        } => {
            if let Some(line) = receive_line
                .as_mut()
                .and_then(|p| p.update(received, expected, percent))
            {
                println!("{line}");
            }
            return;
        }
        SessionEvent::FileReceived(file) => {
            *receive_line = None;
            match write_assembled_file(dir, &file).await {
                Ok(path) => println!(
                    "* received {} ({}), saved to {}",
                    file.filename,
                    format_megabytes(file.bytes.len() as u64),
                    path.display()
                ),
                Err(e) => {
                    tracing::error!(filename = %file.filename, "failed to save received file: {e}");
                    println!("* could not save {}: {e}", file.filename);
                }
            }
            return;
        }
        _ => {}
    }

    if let Some(line) = event_line(&event) {
        println!("{line}");
    }
}

/// Sends a file in the background so chat keeps working meanwhile.
fn spawn_send(session: Arc<Session>, path: PathBuf) {
    tokio::spawn(async move {
        match send_with_progress(&session, &path).await {
            Ok(summary) => println!(
                "* sent {} ({} in {} chunks, {:.1}s)",
                summary.filename,
                format_megabytes(summary.total_size),
                summary.total_chunks,
                summary.elapsed.as_secs_f64()
            ),
            Err(e) => println!("* sending {} failed: {e}", path.display()),
        }
    });
}

async fn send_with_progress(session: &Session, path: &Path) -> anyhow::Result<SendSummary> {
    let (progress_tx, mut progress_rx) = mpsc::channel::<SendProgress>(64);
    let label = format!(
        "sending {}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    );
    let printer = tokio::spawn(async move {
        let mut line = ProgressLine::new(label);
        while let Some(p) = progress_rx.recv().await {
            if let Some(text) = line.update(p.bytes_sent, p.total_size, p.percent) {
                println!("{text}");
            }
        }
    });

    let result = session.send_file(path, progress_tx).await;
    let _ = printer.await;
    Ok(result?)
}

/// Joins, waits for a peer, sends one file, and leaves.
async fn send_once(room: &str, file: &Path, config: &Config) -> anyhow::Result<()> {
    anyhow::ensure!(file.is_file(), "not a file: {}", file.display());

    let (session, mut events) = open_session(room, config).await?;
    println!("* waiting for a peer in room {}", session.room());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::PeerCount(n)) if n >= 2 => break,
                Some(SessionEvent::Disconnected) | None => {
                    anyhow::bail!("disconnected before a peer joined");
                }
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                session.close().await;
                return Ok(());
            }
        }
    }

    let summary = send_with_progress(&session, file).await;
    session.close().await;
    let summary = summary?;
    println!(
        "* sent {} ({} in {} chunks)",
        summary.filename,
        format_megabytes(summary.total_size),
        summary.total_chunks
    );
    Ok(())
}
