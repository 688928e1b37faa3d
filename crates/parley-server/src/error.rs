//! Relay runtime error types.

use parley_proto::ProtocolError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::driver_error::DriverError;

/// Errors that can occur in the relay runtime.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, bad origin, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket I/O failure (bind, accept, local address).
    ///
    /// Fatal when binding; transient for a single accept.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// WebSocket handshake or framing failure.
    ///
    /// Fatal for that connection only.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Driver rejected an event. See [`DriverError`].
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// Internal error (relay task panicked, etc.).
    ///
    /// Indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}
