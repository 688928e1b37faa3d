//! Application input events.
//!
//! Events come from the user (keys), from the transport (channel open,
//! closed, decoded relay events) and from timers the app asked for.

use parley_proto::{ChatMessage, ServerEvent};

use crate::{KeyInput, Timer};

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Channel opened.
    Connected {
        /// Transport carrying the channel.
        transport: String,
    },

    /// Relay acknowledged the session.
    Ready {
        /// Session id assigned by the relay.
        session_id: String,
        /// Transport name reported by the relay.
        transport: String,
    },

    /// Full history replay.
    HistoryReceived(Vec<ChatMessage>),

    /// One broadcast message.
    MessageReceived(ChatMessage),

    /// Channel closed or failed.
    Disconnected {
        /// Human-readable cause.
        reason: String,
    },

    /// A timer started with [`crate::AppAction::StartTimer`] elapsed.
    TimerFired(Timer),
}

impl From<ServerEvent> for AppEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::Ready(ready) => {
                Self::Ready { session_id: ready.session_id, transport: ready.transport }
            },
            ServerEvent::PreviousMessages(entries) => Self::HistoryReceived(entries),
            ServerEvent::Message(message) => Self::MessageReceived(message),
        }
    }
}
