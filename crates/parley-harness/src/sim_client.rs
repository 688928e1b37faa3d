//! Raw protocol client for simulations.
//!
//! Speaks the wire protocol directly so tests can assert on exactly what the
//! relay sends, independent of the client state machine.

use std::{collections::VecDeque, io};

use futures::{SinkExt, StreamExt};
use parley_proto::{ChatMessage, ClientEvent, ServerEvent, codec};
use tokio_tungstenite::{
    WebSocketStream, client_async_with_config,
    tungstenite::{Message, protocol::WebSocketConfig},
};
use turmoil::net::TcpStream;

/// Client-side socket settings. Replays carry the whole log in one frame, so
/// reads are not size-limited.
pub(crate) fn client_config() -> WebSocketConfig {
    WebSocketConfig::default().max_message_size(None).max_frame_size(None)
}

/// Simulated chat client.
pub struct SimClient {
    ws: WebSocketStream<TcpStream>,
    session_id: String,
    /// Events read while waiting for a different kind.
    buffered: VecDeque<ServerEvent>,
}

impl SimClient {
    /// Connect to `address` (`host:port`) and wait for the relay's `ready`.
    pub async fn connect(address: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (ws, _response) =
            client_async_with_config(format!("ws://{address}/"), stream, Some(client_config()))
                .await
                .map_err(io::Error::other)?;

        let mut client = Self { ws, session_id: String::new(), buffered: VecDeque::new() };

        match client.recv().await? {
            ServerEvent::Ready(ready) => client.session_id = ready.session_id,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected ready, got {}", other.name()),
                ));
            },
        }

        Ok(client)
    }

    /// Session id from the relay's acknowledgment.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request the replay and wait for it. Broadcasts that arrive first stay
    /// buffered for [`SimClient::recv`].
    pub async fn request_history(&mut self) -> io::Result<Vec<ChatMessage>> {
        self.send_event(&ClientEvent::GetPreviousMessages).await?;

        let mut skipped = VecDeque::new();
        let entries = loop {
            match self.recv().await? {
                ServerEvent::PreviousMessages(entries) => break entries,
                other => skipped.push_back(other),
            }
        };

        skipped.append(&mut self.buffered);
        self.buffered = skipped;
        Ok(entries)
    }

    /// Send a chat message.
    pub async fn send_message(&mut self, message: ChatMessage) -> io::Result<()> {
        self.send_event(&ClientEvent::Message(message)).await
    }

    /// Send a text frame verbatim.
    pub async fn send_raw(&mut self, text: &str) -> io::Result<()> {
        self.ws.send(Message::text(text)).await.map_err(io::Error::other)
    }

    async fn send_event(&mut self, event: &ClientEvent) -> io::Result<()> {
        let text = codec::encode_client_event(event).map_err(io::Error::other)?;
        self.send_raw(&text).await
    }

    /// Next relay event.
    pub async fn recv(&mut self) -> io::Result<ServerEvent> {
        if let Some(event) = self.buffered.pop_front() {
            return Ok(event);
        }

        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return codec::decode_server_event(text.as_str())
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "relay closed"));
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => return Err(io::Error::other(e)),
            }
        }
    }

    /// Next event, which must be a broadcast message.
    pub async fn recv_message(&mut self) -> io::Result<ChatMessage> {
        match self.recv().await? {
            ServerEvent::Message(message) => Ok(message),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected message, got {}", other.name()),
            )),
        }
    }

    /// Close the channel.
    pub async fn close(mut self) -> io::Result<()> {
        self.ws.close(None).await.map_err(io::Error::other)
    }
}
