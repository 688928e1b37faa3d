//! Simulation relay for testing with turmoil.
//!
//! `SimServer` runs the production [`Relay`] loop and [`serve_connection`]
//! bridge unchanged; only the listener is turmoil's and the environment is
//! [`SimEnv`].

use std::io;

use parley_server::{OriginPolicy, Relay, RelayConfig, RelayHandle, handshake, serve_connection};
use turmoil::net::TcpListener;

use crate::SimEnv;

/// Simulation relay.
pub struct SimServer {
    listener: TcpListener,
    relay: Relay<SimEnv>,
    handle: RelayHandle,
    policy: OriginPolicy,
}

impl SimServer {
    /// Bind with the default relay configuration and seed 0.
    pub async fn bind(address: &str) -> io::Result<Self> {
        Self::bind_with_config(address, RelayConfig::default(), SimEnv::new()).await
    }

    /// Bind with a custom configuration and environment.
    pub async fn bind_with_config(
        address: &str,
        config: RelayConfig,
        env: SimEnv,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let (relay, handle) = Relay::new(env, config);

        Ok(Self { listener, relay, handle, policy: OriginPolicy::any() })
    }

    /// Restrict handshakes to `policy`.
    #[must_use]
    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Handle onto the relay queue (snapshots, shutdown).
    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Accept connections forever.
    pub async fn run(self) -> io::Result<()> {
        let Self { listener, relay, handle, policy } = self;
        tokio::spawn(relay.run());

        loop {
            let (stream, peer) = listener.accept().await?;
            let handle = handle.clone();
            let policy = policy.clone();

            tokio::spawn(async move {
                match handshake(stream, &policy).await {
                    Ok(ws) => {
                        if let Err(e) = serve_connection(ws, handle).await {
                            tracing::debug!("sim connection from {} ended: {}", peer, e);
                        }
                    },
                    Err(e) => tracing::debug!("sim handshake with {} failed: {}", peer, e),
                }
            });
        }
    }
}
