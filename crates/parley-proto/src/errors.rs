//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire events.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Client frame exceeds [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual frame size in bytes
        size: usize,
        /// Maximum accepted size in bytes
        max: usize,
    },

    /// Frame is not a JSON object with a known `event` tag and matching
    /// `data` shape.
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}
