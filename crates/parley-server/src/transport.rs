//! WebSocket transport.
//!
//! Plain TCP listener plus the WebSocket upgrade. Every frame on an upgraded
//! connection is a JSON text frame (see [`parley_proto::codec`]).
//!
//! The upgrade enforces an origin allow-list. Browsers always send an
//! `Origin` header; terminal clients and tests usually don't, and are let
//! through.

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};
use tokio_tungstenite::{
    WebSocketStream, accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::StatusCode,
    },
};

use crate::error::ServerError;

/// Origins allowed to open a channel.
///
/// An empty list allows every origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// Allow only the listed origins (plus requests with no `Origin`).
    pub fn new(allowed: Vec<String>) -> Self {
        let allowed = allowed.into_iter().map(|o| o.trim_end_matches('/').to_string()).collect();
        Self { allowed }
    }

    /// Allow every origin.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether a handshake carrying `origin` may proceed.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(_) if self.allowed.is_empty() => true,
            Some(origin) => {
                let origin = origin.trim_end_matches('/');
                self.allowed.iter().any(|allowed| allowed == origin)
            },
        }
    }
}

/// Upgrade an accepted stream to a WebSocket, enforcing `policy`.
///
/// Generic over the stream so the simulation harness can upgrade its own
/// sockets.
pub async fn handshake<S>(
    stream: S,
    policy: &OriginPolicy,
) -> Result<WebSocketStream<S>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let policy = policy.clone();
    let check_origin = move |request: &Request, response: Response| {
        let origin = request.headers().get("origin").and_then(|value| value.to_str().ok());

        if policy.permits(origin) {
            Ok(response)
        } else {
            tracing::warn!("rejected handshake from origin {:?}", origin);
            let mut rejection = ErrorResponse::new(Some("origin not allowed".to_string()));
            *rejection.status_mut() = StatusCode::FORBIDDEN;
            Err(rejection)
        }
    };

    Ok(accept_hdr_async(stream, check_origin).await?)
}

/// WebSocket listener.
pub struct WsTransport {
    listener: TcpListener,
    policy: Arc<OriginPolicy>,
}

impl WsTransport {
    /// Bind the listener.
    pub async fn bind(address: &str, policy: OriginPolicy) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("WebSocket transport bound to {}", listener.local_addr()?);

        Ok(Self { listener, policy: Arc::new(policy) })
    }

    /// Accept the next TCP connection. The upgrade is left to the caller so a
    /// slow handshake never blocks the accept loop.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        Ok(self.listener.accept().await?)
    }

    /// Origin policy applied to every handshake.
    pub fn policy(&self) -> Arc<OriginPolicy> {
        Arc::clone(&self.policy)
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}
