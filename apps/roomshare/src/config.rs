//! Client configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/roomshare/config.toml`
//! - Windows: `%APPDATA%/roomshare/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use roomshare_connection::SessionOptions;
use roomshare_transfer::{CompletionPolicy, DEFAULT_CHUNK_SIZE, SendOptions};

use crate::cli::Cli;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Relay base URL; rooms live at `{server_url}/ws/{ROOM}`.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Directory where received files are saved.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Bytes per chunk when sending.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between chunks in milliseconds.
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// When a received file counts as complete.
    #[serde(default)]
    pub completion: CompletionPolicy,
}

fn default_server_url() -> String {
    "ws://localhost:8000".into()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("received")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_delay_ms() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            download_dir: default_download_dir(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            completion: CompletionPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or the platform default), creating
    /// a default file if none exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(dir) = &cli.download_dir {
            self.download_dir = dir.clone();
        }
        if let Some(size) = cli.chunk_size {
            self.chunk_size = size;
        }
        if let Some(delay) = cli.chunk_delay_ms {
            self.chunk_delay_ms = delay;
        }
        if cli.marker_only {
            self.completion = CompletionPolicy::MarkerOnly;
        }
    }

    pub fn send_options(&self) -> SendOptions {
        SendOptions::new(self.chunk_size, Duration::from_millis(self.chunk_delay_ms))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            send: self.send_options(),
            completion: self.completion,
            ..SessionOptions::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("roomshare").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("roomshare")
            .join("config.toml"))
    }
}
