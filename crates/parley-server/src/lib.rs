//! Parley relay.
//!
//! Accepts WebSocket channels, keeps the in-memory message log, replays it on
//! request and fans new messages out to every connected session.
//!
//! # Architecture
//!
//! [`RelayDriver`] is Sans-IO: events in, actions out. [`Relay`] is the single
//! task that owns the driver and executes its actions against per-session
//! outbound queues. [`serve_connection`] bridges one upgraded WebSocket to the
//! relay and works over any stream, so the simulation harness runs the same
//! code over simulated TCP.
//!
//! # Components
//!
//! - [`RelayDriver`]: action-based relay logic (no I/O)
//! - [`Relay`] / [`RelayHandle`]: event loop and its queue
//! - [`Server`]: production runtime (Tokio TCP + WebSocket)
//! - [`WsTransport`]: listener and origin-checked upgrade
//! - [`SystemEnv`]: production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod driver_error;
mod error;
mod log;
mod registry;
mod relay;
mod transport;

use std::future::Future;

pub use driver::{
    LogLevel, PayloadPolicy, RelayAction, RelayConfig, RelayDriver, RelayEvent, session_label,
};
pub use driver_error::DriverError;
pub use error::ServerError;
use futures::{SinkExt, StreamExt};
pub use log::MessageLog;
pub use parley_core::SystemEnv;
use parley_proto::codec;
pub use registry::{SessionInfo, SessionRegistry};
pub use relay::{Outbound, Relay, RelayHandle};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
pub use transport::{OriginPolicy, WsTransport, handshake};

/// Relay configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4000")
    pub bind_address: String,
    /// Origins allowed to open a channel. Empty allows any.
    pub allowed_origins: Vec<String>,
    /// Driver configuration (limits, welcome entry, payload policy)
    pub driver: RelayConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            allowed_origins: Vec::new(),
            driver: RelayConfig::default(),
        }
    }
}

/// Production Parley relay.
pub struct Server {
    transport: WsTransport,
    driver_config: RelayConfig,
    env: SystemEnv,
}

impl Server {
    /// Create and bind a new relay.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let policy = OriginPolicy::new(config.allowed_origins);
        let transport = WsTransport::bind(&config.bind_address, policy).await?;

        Ok(Self { transport, driver_config: config.driver, env: SystemEnv::new() })
    }

    /// Run until the process is killed.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then stop the relay loop and close
    /// every session.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("relay listening on {}", self.transport.local_addr()?);

        let (relay, handle) = Relay::new(self.env, self.driver_config);
        let relay_task = tokio::spawn(relay.run());
        let policy = self.transport.policy();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let handle = handle.clone();
                        let policy = std::sync::Arc::clone(&policy);

                        tokio::spawn(async move {
                            match handshake(stream, &policy).await {
                                Ok(ws) => {
                                    if let Err(e) = serve_connection(ws, handle).await {
                                        tracing::debug!("connection from {} ended: {}", peer, e);
                                    }
                                },
                                Err(e) => tracing::debug!("handshake with {} failed: {}", peer, e),
                            }
                        });
                    },
                    Err(e) => tracing::error!("accept error: {}", e),
                },
            }
        }

        tracing::info!("shutting down");
        handle.shutdown();

        let driver = relay_task
            .await
            .map_err(|e| ServerError::Internal(format!("relay task failed: {e}")))?;
        tracing::info!("served {} messages this run", driver.log().len() - 1);

        Ok(())
    }

    /// Local address the relay is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Bridge one upgraded WebSocket to the relay.
///
/// Registers a session, spawns a writer that drains the session's outbound
/// queue into the socket, and feeds decoded inbound frames to the relay until
/// the peer goes away. Undecodable frames are logged and dropped; the channel
/// stays open.
pub async fn serve_connection<S>(
    ws: WebSocketStream<S>,
    handle: RelayHandle,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    let Some(session_id) = handle.open_session(outbound_tx).await else {
        // Relay already stopped
        let _ = sink.close().await;
        return Ok(());
    };

    let writer = tokio::spawn(async move {
        while let Some(outbound) = outbound_rx.recv().await {
            match outbound {
                Outbound::Frame(text) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        tracing::debug!("write to session {:016x} failed: {}", session_id, e);
                        return;
                    }
                },
                Outbound::Close(reason) => {
                    let frame = CloseFrame { code: CloseCode::Policy, reason: reason.into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    return;
                },
            }
        }
        let _ = sink.close().await;
    });

    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match codec::decode_client_event(text.as_str()) {
                Ok(event) => {
                    if !handle.event(session_id, event) {
                        break "relay stopped".to_string();
                    }
                },
                Err(e) => {
                    tracing::warn!("dropped frame from session {:016x}: {}", session_id, e);
                },
            },
            Some(Ok(Message::Binary(_))) => {
                tracing::warn!("dropped binary frame from session {:016x}", session_id);
            },
            Some(Ok(Message::Close(_))) | None => break "peer closed".to_string(),
            Some(Ok(_)) => {},
            Some(Err(e)) => break format!("transport error: {e}"),
        }
    };

    handle.close_session(session_id, reason);

    // The relay dropped our outbound sender, so the writer flushes and exits
    let _ = writer.await;

    Ok(())
}
