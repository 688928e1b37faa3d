//! Terminal client errors.

use std::io;

use parley_core::identity::IdentityError;
use parley_proto::ProtocolError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Channel and terminal failures seen by [`crate::TerminalDriver`].
///
/// Connect and send failures never end the run; the runtime turns them into
/// disconnects.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Terminal output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WebSocket handshake or framing failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Outgoing event could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Send attempted with no open channel.
    #[error("not connected")]
    NotConnected,
}

/// Fatal errors of the `parley` binary.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Identity profile could not be read or written.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// The driver failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Terminal could not be switched to raw mode.
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}
