//! Relay event loop.
//!
//! A single task owns the [`RelayDriver`] and the outbound half of every
//! session's channel. Connection tasks never touch the driver; they push
//! [`Inbound`] items onto one unbounded queue through a [`RelayHandle`], and
//! the loop processes them strictly in arrival order. No locks guard the
//! message log.

use std::collections::{HashMap, VecDeque};

use parley_core::env::Environment;
use parley_proto::{ChatMessage, ClientEvent, ServerEvent, codec};
use tokio::sync::{mpsc, oneshot};

use crate::driver::{LogLevel, RelayAction, RelayConfig, RelayDriver, RelayEvent};

/// What the loop hands to a session's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded JSON text frame.
    Frame(String),
    /// Close the channel with this reason. Nothing follows.
    Close(String),
}

/// Items on the relay's inbound queue.
#[derive(Debug)]
enum Inbound {
    Opened { outbound: mpsc::UnboundedSender<Outbound>, assigned: oneshot::Sender<u64> },
    Received { session_id: u64, event: ClientEvent },
    Closed { session_id: u64, reason: String },
    Snapshot { reply: oneshot::Sender<Vec<ChatMessage>> },
    Shutdown,
}

/// Cloneable sender side of the relay queue.
///
/// Every method returns `false`/`None` once the relay loop has stopped.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl RelayHandle {
    /// Register a new session whose frames go to `outbound`.
    ///
    /// Returns the session id assigned by the relay.
    pub async fn open_session(&self, outbound: mpsc::UnboundedSender<Outbound>) -> Option<u64> {
        let (assigned, rx) = oneshot::channel();
        self.tx.send(Inbound::Opened { outbound, assigned }).ok()?;
        rx.await.ok()
    }

    /// Queue a decoded event from `session_id`.
    pub fn event(&self, session_id: u64, event: ClientEvent) -> bool {
        self.tx.send(Inbound::Received { session_id, event }).is_ok()
    }

    /// Report that `session_id`'s connection went away.
    pub fn close_session(&self, session_id: u64, reason: impl Into<String>) -> bool {
        self.tx.send(Inbound::Closed { session_id, reason: reason.into() }).is_ok()
    }

    /// Copy of the message log, taken between two queued events.
    pub async fn log_snapshot(&self) -> Option<Vec<ChatMessage>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Inbound::Snapshot { reply }).ok()?;
        rx.await.ok()
    }

    /// Ask the loop to stop after the events already queued.
    pub fn shutdown(&self) -> bool {
        self.tx.send(Inbound::Shutdown).is_ok()
    }
}

/// The relay event loop.
pub struct Relay<E>
where
    E: Environment,
{
    driver: RelayDriver<E>,
    env: E,
    sessions: HashMap<u64, mpsc::UnboundedSender<Outbound>>,
    rx: mpsc::UnboundedReceiver<Inbound>,
}

impl<E> Relay<E>
where
    E: Environment,
{
    /// Create the loop and the handle connection tasks use to reach it.
    pub fn new(env: E, config: RelayConfig) -> (Self, RelayHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = Self {
            driver: RelayDriver::new(env.clone(), config),
            env,
            sessions: HashMap::new(),
            rx,
        };
        (relay, RelayHandle { tx })
    }

    /// Process queued items until shutdown is requested or every handle is
    /// dropped. Returns the driver so callers can inspect the final log.
    pub async fn run(mut self) -> RelayDriver<E> {
        while let Some(item) = self.rx.recv().await {
            if matches!(item, Inbound::Shutdown) {
                break;
            }
            self.handle(item);
        }

        tracing::info!(
            "relay stopped with {} log entries, {} sessions connected",
            self.driver.log().len(),
            self.driver.session_count()
        );

        for (_, outbound) in self.sessions.drain() {
            let _ = outbound.send(Outbound::Close("relay shutting down".to_string()));
        }

        self.driver
    }

    fn handle(&mut self, item: Inbound) {
        match item {
            Inbound::Opened { outbound, assigned } => {
                let session_id = self.fresh_session_id();
                if assigned.send(session_id).is_err() {
                    // Connection task gave up before the id arrived
                    return;
                }
                self.sessions.insert(session_id, outbound);
                self.dispatch(RelayEvent::SessionAccepted { session_id });
            },
            Inbound::Received { session_id, event } => {
                self.dispatch(RelayEvent::EventReceived { session_id, event });
            },
            Inbound::Closed { session_id, reason } => {
                self.sessions.remove(&session_id);
                self.dispatch(RelayEvent::SessionClosed { session_id, reason });
            },
            Inbound::Snapshot { reply } => {
                let _ = reply.send(self.driver.log().snapshot());
            },
            Inbound::Shutdown => {},
        }
    }

    fn fresh_session_id(&self) -> u64 {
        loop {
            let candidate = self.env.random_u64();
            if !self.sessions.contains_key(&candidate) && !self.driver.has_session(candidate) {
                return candidate;
            }
        }
    }

    /// Run an event and everything it causes (failed sends become closes)
    /// before returning.
    fn dispatch(&mut self, event: RelayEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            match self.driver.process_event(event) {
                Ok(actions) => self.execute_actions(actions, &mut pending),
                Err(e) => tracing::warn!("dropped event: {}", e),
            }
        }
    }

    fn execute_actions(
        &mut self,
        actions: Vec<RelayAction<E::Instant>>,
        pending: &mut VecDeque<RelayEvent>,
    ) {
        for action in actions {
            match action {
                RelayAction::SendToSession { session_id, event } => {
                    if let Some(frame) = encode(&event) {
                        self.deliver(session_id, frame, pending);
                    }
                },

                RelayAction::Broadcast { recipients, event } => {
                    if let Some(frame) = encode(&event) {
                        for session_id in recipients {
                            self.deliver(session_id, frame.clone(), pending);
                        }
                    }
                },

                RelayAction::CloseSession { session_id, reason } => {
                    tracing::info!("closing session {:016x}: {}", session_id, reason);
                    if let Some(outbound) = self.sessions.remove(&session_id) {
                        let _ = outbound.send(Outbound::Close(reason));
                    }
                },

                RelayAction::Log { level, message, .. } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }
    }

    /// Hand a frame to a session's writer. A closed writer counts as a
    /// disconnect.
    fn deliver(&mut self, session_id: u64, frame: String, pending: &mut VecDeque<RelayEvent>) {
        let Some(outbound) = self.sessions.get(&session_id) else {
            return;
        };

        if outbound.send(Outbound::Frame(frame)).is_err() {
            self.sessions.remove(&session_id);
            pending.push_back(RelayEvent::SessionClosed {
                session_id,
                reason: "send failed".to_string(),
            });
        }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match codec::encode_server_event(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!("failed to encode {} event: {}", event.name(), e);
            None
        },
    }
}
