//! Parley terminal client.
//!
//! A scrollback front end for the [`parley_app`] state machine. Crossterm key
//! events drive the composer, relay events and timers arrive over a
//! tokio-tungstenite channel, and each render appends to the scrollback.
//!
//! # Components
//!
//! - [`TerminalDriver`]: the [`parley_app::Driver`] implementation
//! - [`Transcript`]: turns app state into scrollback lines
//! - [`keys`]: crossterm key event mapping
//! - [`RawModeGuard`]: raw terminal mode for the session

#![forbid(unsafe_code)]

mod error;
pub mod keys;
mod terminal;
mod transcript;

pub use error::{RuntimeError, TransportError};
pub use terminal::{RawModeGuard, TerminalDriver};
pub use transcript::{EMPTY_PLACEHOLDER, OWN_LABEL, Transcript, format_message, prompt_line};
