//! [`Driver`] implementation over turmoil.
//!
//! Runs the production [`parley_app::Runtime`] inside a simulation. Test code
//! feeds user input through a [`SimInput`]; relay events, channel loss and
//! timers are produced by tasks the driver spawns.

use std::time::Duration;

use futures::{SinkExt, StreamExt, stream::SplitSink};
use parley_app::{App, AppEvent, Driver, Timer};
use parley_proto::{ClientEvent, ProtocolError, codec};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    WebSocketStream, client_async_with_config,
    tungstenite::{self, Message},
};
use turmoil::net::TcpStream;

use crate::sim_client::client_config;

/// Errors from the simulated driver.
#[derive(Debug, Error)]
pub enum SimDriverError {
    /// TCP failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// WebSocket failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    /// Encoding failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// `send` with no open channel.
    #[error("not connected")]
    NotConnected,
}

/// Test-side handle for feeding user input.
///
/// Dropping every `SimInput` ends the driver's input, which unmounts the app.
#[derive(Debug, Clone)]
pub struct SimInput {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl SimInput {
    /// Queue an input event.
    pub fn push(&self, event: AppEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Type `text` and press Enter.
    pub fn type_line(&self, text: &str) -> bool {
        text.chars().all(|c| self.push(AppEvent::Key(parley_app::KeyInput::Char(c))))
            && self.push(AppEvent::Key(parley_app::KeyInput::Enter { shift: false }))
    }
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Simulated client driver.
pub struct SimDriver {
    input: mpsc::UnboundedReceiver<AppEvent>,
    /// Channel events tagged with the connection generation that produced them.
    internal_tx: mpsc::UnboundedSender<(u64, AppEvent)>,
    internal_rx: mpsc::UnboundedReceiver<(u64, AppEvent)>,
    sink: Option<WsSink>,
    generation: u64,
    renders: usize,
}

impl SimDriver {
    /// Create a driver and the handle that feeds it input.
    pub fn new() -> (Self, SimInput) {
        let (tx, input) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let driver = Self { input, internal_tx, internal_rx, sink: None, generation: 0, renders: 0 };
        (driver, SimInput { tx })
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, SimDriverError> {
        loop {
            let current = self.generation;

            tokio::select! {
                biased;

                internal = self.internal_rx.recv() => {
                    // Events from a replaced connection are stale. Timers carry
                    // generation 0 and always apply.
                    if let Some((generation, event)) = internal
                        && (generation == 0 || generation == current)
                    {
                        return Ok(Some(event));
                    }
                },
                input = self.input.recv() => return Ok(input),
            }
        }
    }

    async fn connect(&mut self, server_addr: &str) -> Result<String, SimDriverError> {
        let authority =
            server_addr.trim_start_matches("ws://").split('/').next().unwrap_or_default();

        let stream = TcpStream::connect(authority).await?;
        let (ws, _response) =
            client_async_with_config(server_addr, stream, Some(client_config())).await?;
        let (sink, mut stream) = ws.split();

        self.generation += 1;
        let generation = self.generation;
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => match codec::decode_server_event(text.as_str()) {
                        Ok(event) => {
                            if tx.send((generation, AppEvent::from(event))).is_err() {
                                return;
                            }
                        },
                        Err(e) => tracing::warn!("sim client dropped frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => break "relay closed".to_string(),
                    Some(Ok(_)) => {},
                    Some(Err(e)) => break e.to_string(),
                }
            };
            let _ = tx.send((generation, AppEvent::Disconnected { reason }));
        });

        self.sink = Some(sink);
        Ok("websocket".to_string())
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), SimDriverError> {
        let sink = self.sink.as_mut().ok_or(SimDriverError::NotConnected)?;
        let text = codec::encode_client_event(&event)?;
        Ok(sink.send(Message::text(text)).await?)
    }

    fn start_timer(&mut self, timer: Timer, delay: Duration) {
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send((0, AppEvent::TimerFired(timer)));
        });
    }

    fn render(&mut self, _app: &App) -> Result<(), SimDriverError> {
        self.renders += 1;
        Ok(())
    }

    fn redirect_to_name_entry(&mut self) -> Result<(), SimDriverError> {
        tracing::info!("sim client redirected to name entry");
        Ok(())
    }

    fn stop(&mut self) {
        self.sink = None;
        self.generation += 1;
    }
}
