//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait, while the generic
//! [`crate::Runtime`] handles all orchestration.

use std::{future::Future, time::Duration};

use parley_proto::ClientEvent;

use crate::{App, AppEvent, Timer};

/// Abstracts I/O operations for the application runtime.
///
/// # Implementations
///
/// - **Terminal**: stdin lines, tokio-tungstenite WebSocket
/// - **Simulation**: turmoil TCP with the same WebSocket framing
///
/// # Contract
///
/// `poll_event` multiplexes user input, decoded relay events, channel loss
/// and timers. A driver must only report [`AppEvent::Disconnected`] for the
/// channel it opened last, never for one it already replaced.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next event.
    ///
    /// Returns `None` when the input source is exhausted; the runtime then
    /// unmounts the view.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Open a channel to the relay.
    ///
    /// Returns the transport name on success. A failure is not fatal; the
    /// runtime reports it to the app as a disconnect.
    fn connect(&mut self, server_addr: &str)
    -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Send an event over the open channel.
    fn send(&mut self, event: ClientEvent) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Arrange for `poll_event` to yield [`AppEvent::TimerFired`] after
    /// `delay`.
    fn start_timer(&mut self, timer: Timer, delay: Duration);

    /// Render the application state.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Show the name-entry surface.
    fn redirect_to_name_entry(&mut self) -> Result<(), Self::Error>;

    /// Close the channel and clean up resources.
    fn stop(&mut self);
}
