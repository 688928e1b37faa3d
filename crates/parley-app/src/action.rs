//! Application side-effects and intents.
//!
//! [`AppAction`]s are produced by the [`crate::App`] state machine for the
//! runtime to execute.

use std::time::Duration;

use parley_proto::ClientEvent;

use crate::Timer;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Open a channel to the relay.
    Connect {
        /// Relay address.
        server_addr: String,
    },

    /// Send an event over the open channel.
    Send(ClientEvent),

    /// Fire [`crate::AppEvent::TimerFired`] after `delay`.
    StartTimer {
        /// Which timer.
        timer: Timer,
        /// How long from now.
        delay: Duration,
    },

    /// No display name is stored; show the name-entry surface instead.
    RedirectToNameEntry,

    /// Close the channel and release resources. Nothing follows.
    Release,
}
