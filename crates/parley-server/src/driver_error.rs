//! Relay driver error types.

use thiserror::Error;

/// Errors returned by [`crate::RelayDriver::process_event`].
///
/// None of these are fatal to the relay. The runtime logs them and drops the
/// offending event; no error event is sent to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Event from a session that is not registered.
    ///
    /// Usually transient: the session disconnected while its event was still
    /// queued.
    #[error("session not found: {0:016x}")]
    SessionNotFound(u64),

    /// Session id is already registered.
    ///
    /// Session ids are random; a collision means the runtime must close the
    /// new connection.
    #[error("session already exists: {0:016x}")]
    SessionAlreadyExists(u64),
}
