//! Text-frame encoding and best-effort decoding of [`ControlMessage`]s.

use serde::Deserialize;

use crate::constants::MessageType;
use crate::messages::ControlMessage;

/// Why a text frame could not be decoded into a known control message.
///
/// Never surfaced to users: callers downgrade it to
/// [`ControlMessage::Unrecognized`] via [`ControlMessage::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeFailure {
    #[error("not valid JSON: {0}")]
    Malformed(String),

    #[error("JSON value is not an object")]
    NotAnObject,

    #[error("missing or non-string \"type\" field")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid {msg_type} message: {reason}")]
    Invalid { msg_type: &'static str, reason: String },
}

#[derive(Deserialize)]
struct TypePeek {
    #[serde(rename = "type")]
    msg_type: Option<MessageType>,
}

/// Encodes a control message as a text frame.
///
/// [`ControlMessage::Unrecognized`] is passed through verbatim.
pub fn encode(msg: &ControlMessage) -> Result<String, serde_json::Error> {
    match msg {
        ControlMessage::Unrecognized { raw } => Ok(raw.clone()),
        other => serde_json::to_string(other),
    }
}

/// Decodes a text frame into a control message.
pub fn decode(text: &str) -> Result<ControlMessage, DecodeFailure> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeFailure::Malformed(e.to_string()))?;
    let Some(obj) = value.as_object() else {
        return Err(DecodeFailure::NotAnObject);
    };

    // Peek at the tag first so unknown types are told apart from broken fields.
    let msg_type = match obj.get("type") {
        Some(serde_json::Value::String(_)) => {
            let peek: TypePeek = serde_json::from_value(value.clone())
                .map_err(|_| DecodeFailure::MissingType)?;
            peek.msg_type.ok_or(DecodeFailure::MissingType)?
        }
        _ => return Err(DecodeFailure::MissingType),
    };

    if msg_type == MessageType::Unknown {
        let tag = obj
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        return Err(DecodeFailure::UnknownType(tag));
    }

    serde_json::from_value(value).map_err(|e| DecodeFailure::Invalid {
        msg_type: msg_type.as_str(),
        reason: e.to_string(),
    })
}

impl ControlMessage {
    /// Decodes a text frame, treating anything undecodable as freeform text.
    pub fn parse(text: &str) -> Self {
        decode(text).unwrap_or_else(|_| ControlMessage::Unrecognized {
            raw: text.to_string(),
        })
    }

    /// Encodes this message as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        encode(self)
    }
}
