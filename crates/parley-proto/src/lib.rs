//! Parley wire protocol.
//!
//! Every frame on the channel is a UTF-8 JSON object tagged with the event
//! name, `{"event": <name>, "data": <payload>}`. The relay and clients share
//! the types in this crate so both ends agree on event names and field names.
//!
//! # Components
//!
//! - [`ChatMessage`]: the unit of conversation
//! - [`ClientEvent`]: events a client sends to the relay
//! - [`ServerEvent`]: events the relay sends to a client
//! - [`codec`]: JSON text encoding with a frame size limit

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
mod event;
mod message;

pub use codec::MAX_FRAME_SIZE;
pub use errors::{ProtocolError, Result};
pub use event::{ClientEvent, EventName, ServerEvent, SessionReady};
pub use message::ChatMessage;
