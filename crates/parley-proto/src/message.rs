//! Chat message payload.

use serde::{Deserialize, Serialize};

/// A single chat message as it travels on the wire and sits in the log.
///
/// The relay attaches no id, timestamp or sequence number: a message's
/// position in the log is its only ordering.
///
/// Wire field names are `msg`, `name` and `id`. The descriptive names `text`,
/// `senderName` and `senderId` are accepted on input. Missing fields decode as
/// empty strings so that the relay can stay permissive about what it relays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display text.
    #[serde(rename = "msg", alias = "text", default)]
    pub text: String,

    /// Display name chosen by the sender for its session.
    #[serde(rename = "name", alias = "senderName", default)]
    pub sender_name: String,

    /// Stable identifier of the sending client installation.
    #[serde(rename = "id", alias = "senderId", default)]
    pub sender_id: String,
}

impl ChatMessage {
    /// Text of the entry every log starts with.
    pub const WELCOME_TEXT: &'static str = "Welcome to the chat!";
    /// Sender name of the welcome entry.
    pub const SERVER_NAME: &'static str = "Server";
    /// Sender id of the welcome entry.
    pub const SERVER_ID: &'static str = "server-id";

    /// Create a message.
    pub fn new(
        text: impl Into<String>,
        sender_name: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self { text: text.into(), sender_name: sender_name.into(), sender_id: sender_id.into() }
    }

    /// The fixed welcome entry that seeds a fresh log.
    pub fn welcome() -> Self {
        Self::new(Self::WELCOME_TEXT, Self::SERVER_NAME, Self::SERVER_ID)
    }

    /// All three fields are present and the text is not blank.
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty() && !self.sender_name.is_empty() && !self.sender_id.is_empty()
    }
}
