//! Parley terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! # First run: store a display name in the profile, then chat
//! parley --name Alice
//!
//! # Later runs reuse the stored name
//! parley --server ws://chat.example.com:4000
//! ```
//!
//! Type and press Enter to send. Shift+Enter (or Alt+Enter where the terminal
//! cannot report Shift) starts a new line in the message. Esc or Ctrl+C
//! leaves.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use parley_app::{AppConfig, HistoryTrigger, Runtime};
use crossterm::event::EventStream;
use parley_cli::{RawModeGuard, RuntimeError, TerminalDriver};
use parley_core::{
    SystemEnv,
    identity::{FileStore, IdentityStore, USERNAME_KEY, load_identity},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley terminal client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Terminal client for the Parley chat relay")]
#[command(version)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:4000")]
    server: String,

    /// Identity profile (JSON file holding user_id and username)
    #[arg(short, long, default_value = "parley-profile.json")]
    profile: PathBuf,

    /// Store this display name in the profile before connecting
    #[arg(short, long)]
    name: Option<String>,

    /// Delay before reconnecting after the channel drops (0 disables)
    #[arg(long, default_value = "2000")]
    reconnect_delay_ms: u64,

    /// Request history this long after connecting instead of waiting for the
    /// relay's ready acknowledgment
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), RuntimeError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Scrollback owns stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let env = SystemEnv::new();
    let mut store = FileStore::open(&args.profile)?;

    if let Some(name) = args.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        store.set(USERNAME_KEY, name)?;
        tracing::info!("stored display name in {}", store.path().display());
    }

    let identity = load_identity(&mut store, &env)?;

    let history_trigger = match args.settle_delay_ms {
        Some(ms) => HistoryTrigger::SettleDelay(Duration::from_millis(ms)),
        None => HistoryTrigger::ReadyAck,
    };
    let config = AppConfig {
        server_addr: args.server,
        history_trigger,
        reconnect_delay: (args.reconnect_delay_ms > 0)
            .then(|| Duration::from_millis(args.reconnect_delay_ms)),
    };

    let raw_mode = RawModeGuard::enable()?;
    let driver = TerminalDriver::new(EventStream::new(), std::io::stdout());
    let result = Runtime::new(driver, config).run(identity).await;
    drop(raw_mode);
    let app = result?;

    tracing::debug!("left with {} messages in view", app.messages().len());
    Ok(())
}
