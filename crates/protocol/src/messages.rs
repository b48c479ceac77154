use serde::{Deserialize, Serialize};

use crate::constants::MessageType;

/// A control message carried in a text frame.
///
/// Field names follow the wire format (`chunk_index`, `total_size`, ...).
/// Numeric and string fields are decoded leniently: a missing, null or
/// wrongly-typed field falls back to `0` / `""` instead of failing the
/// whole message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Number of peers currently in the room (sent by the relay).
    #[serde(rename = "peers")]
    PeerCount {
        #[serde(default, with = "lenient_uint")]
        count: u64,
    },

    /// Announces an incoming file.
    #[serde(rename = "file_info")]
    FileInfo {
        #[serde(default, with = "lenient_string")]
        filename: String,
        #[serde(default, with = "lenient_uint")]
        size: u64,
        #[serde(default, with = "lenient_uint")]
        timestamp: u64,
    },

    /// Metadata for the binary frame that immediately follows.
    #[serde(rename = "file_chunk")]
    ChunkInfo {
        #[serde(default, with = "lenient_uint")]
        chunk_index: u64,
        #[serde(default, with = "lenient_uint")]
        size: u64,
    },

    /// End of a file transfer.
    #[serde(rename = "file_complete")]
    FileComplete {
        #[serde(default, with = "lenient_uint")]
        total_chunks: u64,
        #[serde(default, with = "lenient_uint")]
        total_size: u64,
    },

    /// Chat line.
    #[serde(rename = "chat")]
    Chat {
        #[serde(default, with = "lenient_string")]
        message: String,
        #[serde(default, with = "lenient_uint")]
        timestamp: u64,
    },

    /// Relay keepalive.
    #[serde(rename = "ping")]
    Ping,

    /// Anything else a peer sent, kept verbatim.
    #[serde(skip)]
    Unrecognized { raw: String },
}

impl ControlMessage {
    /// Builds a `file_info` message stamped with the current time.
    pub fn file_info(filename: impl Into<String>, size: u64) -> Self {
        ControlMessage::FileInfo {
            filename: filename.into(),
            size,
            timestamp: now_millis(),
        }
    }

    /// Builds a `chat` message stamped with the current time.
    pub fn chat(message: impl Into<String>) -> Self {
        ControlMessage::Chat {
            message: message.into(),
            timestamp: now_millis(),
        }
    }

    /// Returns the wire discriminant, or `None` for [`ControlMessage::Unrecognized`].
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            ControlMessage::PeerCount { .. } => Some(MessageType::Peers),
            ControlMessage::FileInfo { .. } => Some(MessageType::FileInfo),
            ControlMessage::ChunkInfo { .. } => Some(MessageType::FileChunk),
            ControlMessage::FileComplete { .. } => Some(MessageType::FileComplete),
            ControlMessage::Chat { .. } => Some(MessageType::Chat),
            ControlMessage::Ping => Some(MessageType::Ping),
            ControlMessage::Unrecognized { .. } => None,
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

mod lenient_uint {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
            _ => 0,
        })
    }
}

mod lenient_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        })
    }
}
