//! Observable application state types.
//!
//! [`Phase`] is the lifecycle of one mounted chat view. [`ConnectionState`] is
//! what the status bar shows; it is coarser than the phase.

use std::time::Duration;

/// Lifecycle of a chat view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, not mounted yet.
    Uninitialized,
    /// Channel being opened.
    Connecting,
    /// Channel open, replay not received yet.
    AwaitingHistory,
    /// Replay received (or already requested on an earlier connection).
    Live,
    /// Channel lost. The view is kept.
    Disconnected,
    /// Unmounted or redirected to name entry. Terminal.
    Closed,
}

impl Phase {
    /// Channel is open in this phase.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::AwaitingHistory | Self::Live)
    }
}

/// Connection status shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the relay.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Channel open.
    Connected {
        /// Transport carrying the channel (e.g. `websocket`).
        transport: String,
    },
}

/// What makes the view ask for the history replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryTrigger {
    /// The relay's `ready` acknowledgment.
    #[default]
    ReadyAck,
    /// A fixed delay after the channel opens.
    ///
    /// Fragile: a relay that is slower than the delay misses the request's
    /// registration window. Only for relays that never send `ready`.
    SettleDelay(Duration),
}

/// Timers the view asks the runtime to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Settle delay before the history request.
    Settle,
    /// Delay before the next reconnect attempt.
    Reconnect,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Relay address (WebSocket URL).
    pub server_addr: String,
    /// History request trigger.
    pub history_trigger: HistoryTrigger,
    /// Delay before reconnecting after the channel drops. `None` disables
    /// reconnects.
    pub reconnect_delay: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "ws://127.0.0.1:4000".to_string(),
            history_trigger: HistoryTrigger::ReadyAck,
            reconnect_delay: Some(Duration::from_secs(2)),
        }
    }
}
