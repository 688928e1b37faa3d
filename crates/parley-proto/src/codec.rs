//! JSON text codec for wire events.
//!
//! Only frames arriving at the relay are bounded by [`MAX_FRAME_SIZE`], and
//! the size is checked before touching the JSON parser. Relay-to-client frames
//! are not capped: a history replay is one frame holding the whole log, and
//! the log has no size limit.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ClientEvent, ProtocolError, Result, ServerEvent};

/// Maximum size of a frame sent by a client (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1 << 20;

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}

/// Encode an event sent by a client.
///
/// Fails with [`ProtocolError::FrameTooLarge`] if the relay would reject the
/// frame.
pub fn encode_client_event(event: &ClientEvent) -> Result<String> {
    let text = encode(event)?;
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
    }
    Ok(text)
}

/// Decode an event received by the relay.
pub fn decode_client_event(text: &str) -> Result<ClientEvent> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
    }
    decode(text)
}

/// Encode an event sent by the relay. Never size-limited.
pub fn encode_server_event(event: &ServerEvent) -> Result<String> {
    encode(event)
}

/// Decode an event received by a client. Never size-limited.
pub fn decode_server_event(text: &str) -> Result<ServerEvent> {
    decode(text)
}
