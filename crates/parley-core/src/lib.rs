//! Parley core.
//!
//! Pieces shared by the relay and the client that do not touch the network:
//!
//! - [`env::Environment`]: time and randomness, swappable for deterministic
//!   simulation
//! - [`identity`]: the client's persisted sender id and display name
//! - `SystemEnv` (feature `system`): the production environment, shared by the
//!   relay and the terminal client

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod identity;
#[cfg(feature = "system")]
mod system_env;

#[cfg(feature = "system")]
pub use system_env::SystemEnv;
