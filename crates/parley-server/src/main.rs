//! Parley relay binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port, any origin
//! parley-server
//!
//! # Only accept browser pages served from the dev server
//! parley-server --bind 0.0.0.0:4000 --allowed-origin http://localhost:3000
//! ```

use clap::Parser;
use parley_proto::ChatMessage;
use parley_server::{PayloadPolicy, RelayConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley chat relay
#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Parley chat relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:4000")]
    bind: String,

    /// Maximum concurrent sessions
    #[arg(long, default_value = "10000")]
    max_sessions: usize,

    /// Origin allowed to connect (repeatable; none means any)
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,

    /// Text of the seed entry of the message log
    #[arg(long, default_value = ChatMessage::WELCOME_TEXT)]
    welcome_text: String,

    /// Drop messages with blank text or empty sender fields
    #[arg(long)]
    strict_payloads: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Parley relay starting");

    if args.allowed_origins.is_empty() {
        tracing::warn!("no --allowed-origin given, accepting any origin");
    }

    let payload_policy =
        if args.strict_payloads { PayloadPolicy::Strict } else { PayloadPolicy::Permissive };

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        allowed_origins: args.allowed_origins,
        driver: RelayConfig {
            max_sessions: args.max_sessions,
            welcome: ChatMessage::new(
                args.welcome_text,
                ChatMessage::SERVER_NAME,
                ChatMessage::SERVER_ID,
            ),
            payload_policy,
            ..Default::default()
        },
    };

    let server = Server::bind(config).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
