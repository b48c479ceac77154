//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "roomshare")]
#[command(version, about = "Chat and share files with a peer in a room")]
pub struct Cli {
    /// Relay base URL, e.g. ws://localhost:8000
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory where received files are saved
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Bytes per chunk when sending
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Pause between chunks in milliseconds
    #[arg(long, global = true)]
    pub chunk_delay_ms: Option<u64>,

    /// Finish received files only on an explicit completion message
    #[arg(long, global = true)]
    pub marker_only: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Ask the relay for a new room code
    New,

    /// Join a room to chat and exchange files
    Join {
        /// Room code
        room: String,
    },

    /// Join a room, send one file, and leave
    Send {
        /// Room code
        room: String,

        /// File to send
        file: PathBuf,
    },
}
