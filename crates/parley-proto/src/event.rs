//! Named events carried over the channel.
//!
//! Events are adjacently tagged: the variant name travels in `event`, the
//! payload (if any) in `data`. Each variant maps to exactly one event name, see
//! [`ClientEvent::name`] and [`ServerEvent::name`].

use serde::{Deserialize, Serialize};

use crate::ChatMessage;

/// Wire names of every event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// `ready`
    Ready,
    /// `getPreviousMessages`
    GetPreviousMessages,
    /// `previousMessages`
    PreviousMessages,
    /// `message`
    Message,
}

impl EventName {
    /// Name as it appears in the `event` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::GetPreviousMessages => "getPreviousMessages",
            Self::PreviousMessages => "previousMessages",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Request a replay of the full log.
    GetPreviousMessages,

    /// Append a message to the log and broadcast it.
    Message(ChatMessage),
}

impl ClientEvent {
    /// Wire name of this event.
    pub const fn name(&self) -> EventName {
        match self {
            Self::GetPreviousMessages => EventName::GetPreviousMessages,
            Self::Message(_) => EventName::Message,
        }
    }
}

/// Payload of the readiness acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReady {
    /// Session id assigned by the relay, as 16 lowercase hex digits.
    pub session_id: String,
    /// Name of the transport carrying the channel (e.g. `websocket`).
    pub transport: String,
}

/// Events sent by the relay to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The session is registered and may issue requests.
    Ready(SessionReady),

    /// Full log snapshot, oldest entry first. Unicast to the requester.
    PreviousMessages(Vec<ChatMessage>),

    /// A message appended to the log. Broadcast to every session.
    Message(ChatMessage),
}

impl ServerEvent {
    /// Wire name of this event.
    pub const fn name(&self) -> EventName {
        match self {
            Self::Ready(_) => EventName::Ready,
            Self::PreviousMessages(_) => EventName::PreviousMessages,
            Self::Message(_) => EventName::Message,
        }
    }
}
