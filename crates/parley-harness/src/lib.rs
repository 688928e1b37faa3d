//! Deterministic simulation harness for Parley.
//!
//! Turmoil-based pieces for reproducible end-to-end tests: the real relay
//! event loop and WebSocket bridge run over simulated TCP, with virtual time
//! and a seeded RNG.
//!
//! # Components
//!
//! - [`SimEnv`]: virtual time plus a seeded ChaCha RNG
//! - [`SimServer`]: the production relay loop on a turmoil listener
//! - [`SimClient`]: raw protocol client for asserting on relay events
//! - [`SimDriver`]: [`parley_app::Driver`] over turmoil, to run the real
//!   client runtime inside a simulation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_client;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;

pub use sim_client::SimClient;
pub use sim_driver::{SimDriver, SimDriverError, SimInput};
pub use sim_env::SimEnv;
pub use sim_server::SimServer;
