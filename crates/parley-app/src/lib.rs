//! Application layer for Parley
//!
//! Pure client state machine and a generic runtime, so the same orchestration
//! code runs in the terminal client and in simulation.
//!
//! # Components
//!
//! - [`App`]: chat view state machine (lifecycle, history, composer)
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: generic orchestration loop using a Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use driver::Driver;
pub use event::AppEvent;
pub use input::KeyInput;
pub use runtime::Runtime;
pub use state::{AppConfig, ConnectionState, HistoryTrigger, Phase, Timer};
