//! Room codes issued by the relay's HTTP API.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::ConnectionError;
use crate::ws_client::normalize_room_code;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct NewCodeResponse {
    code: String,
}

/// HTTP base of a relay given by its WebSocket URL.
///
/// `ws://` maps to `http://` and `wss://` to `https://`; other schemes
/// are kept.
pub fn api_base(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if let Some(rest) = server.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = server.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        server.to_string()
    }
}

/// Asks the relay for a fresh room code (`GET /new-code`).
pub async fn request_room_code(server: &str) -> Result<String, ConnectionError> {
    let url = format!("{}/new-code", api_base(server));
    let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    let response = http.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(ConnectionError::Api(format!(
            "{url} returned status {}",
            response.status()
        )));
    }
    let body: NewCodeResponse = response.json().await?;
    let code = normalize_room_code(&body.code)?;
    info!(code = %code, "room code issued");
    Ok(code)
}
