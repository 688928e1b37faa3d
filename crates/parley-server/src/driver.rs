//! Relay driver.
//!
//! Ties together the session registry and the message log. The driver is
//! Sans-IO: it consumes [`RelayEvent`]s and returns [`RelayAction`]s for the
//! runtime to execute, and never touches a socket or a clock of its own.
//!
//! The runtime feeds every event from every session through one
//! [`RelayDriver`] sequentially. Append-then-broadcast for one message is a
//! single `process_event` call, so two senders can never interleave.

use parley_core::env::Environment;
use parley_proto::{ChatMessage, ClientEvent, ServerEvent, SessionReady};

use crate::{
    driver_error::DriverError,
    log::MessageLog,
    registry::{SessionInfo, SessionRegistry},
};

/// How the relay treats `message` payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadPolicy {
    /// Append and broadcast every payload as received, including ones with
    /// empty fields.
    #[default]
    Permissive,
    /// Drop payloads whose text is blank or whose sender fields are empty.
    Strict,
}

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum concurrent sessions
    pub max_sessions: usize,
    /// Seed entry of the message log
    pub welcome: ChatMessage,
    /// Payload validation policy
    pub payload_policy: PayloadPolicy,
    /// Transport name reported in the readiness acknowledgment
    pub transport_name: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            welcome: ChatMessage::welcome(),
            payload_policy: PayloadPolicy::Permissive,
            transport_name: "websocket".to_string(),
        }
    }
}

/// Events that the relay driver processes.
///
/// These are produced by the runtime (production or simulation).
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A new session was accepted by the transport
    SessionAccepted {
        /// Unique session ID assigned by the runtime
        session_id: u64,
    },

    /// A decoded event arrived from a session
    EventReceived {
        /// Session that sent the event
        session_id: u64,
        /// The received event
        event: ClientEvent,
    },

    /// A session went away (peer close, transport error or failed send)
    SessionClosed {
        /// Session that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the relay driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction<I> {
    /// Send an event to one session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Event to send
        event: ServerEvent,
    },

    /// Send the same event to each listed session, in list order
    Broadcast {
        /// Sessions registered when the message was appended
        recipients: Vec<u64>,
        /// Event to send
        event: ServerEvent,
    },

    /// Close a session's connection
    CloseSession {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Log a message
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Log levels for relay actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Render a session id the way it appears on the wire and in logs.
pub fn session_label(session_id: u64) -> String {
    format!("{session_id:016x}")
}

/// Action-based relay driver.
///
/// Sole owner of the [`MessageLog`]. All reads and writes of the log go
/// through [`RelayDriver::process_event`].
pub struct RelayDriver<E>
where
    E: Environment,
{
    /// Connected sessions
    registry: SessionRegistry,
    /// Append-only history
    log: MessageLog,
    /// Environment (time)
    env: E,
    /// Relay configuration
    config: RelayConfig,
}

impl<E> RelayDriver<E>
where
    E: Environment,
{
    /// Create a driver with a freshly seeded log.
    pub fn new(env: E, config: RelayConfig) -> Self {
        Self {
            registry: SessionRegistry::new(),
            log: MessageLog::seeded(config.welcome.clone()),
            env,
            config,
        }
    }

    /// Process a relay event and return actions to execute.
    pub fn process_event(
        &mut self,
        event: RelayEvent,
    ) -> Result<Vec<RelayAction<E::Instant>>, DriverError> {
        match event {
            RelayEvent::SessionAccepted { session_id } => self.handle_session_accepted(session_id),
            RelayEvent::EventReceived { session_id, event } => match event {
                ClientEvent::GetPreviousMessages => self.handle_history_request(session_id),
                ClientEvent::Message(message) => self.handle_message(session_id, message),
            },
            RelayEvent::SessionClosed { session_id, reason } => {
                Ok(self.handle_session_closed(session_id, &reason))
            },
        }
    }

    fn handle_session_accepted(
        &mut self,
        session_id: u64,
    ) -> Result<Vec<RelayAction<E::Instant>>, DriverError> {
        let now = self.env.now();

        if self.registry.session_count() >= self.config.max_sessions {
            return Ok(vec![
                RelayAction::CloseSession {
                    session_id,
                    reason: "max sessions exceeded".to_string(),
                },
                RelayAction::Log {
                    level: LogLevel::Warn,
                    message: format!(
                        "rejected session {}: {} sessions connected",
                        session_label(session_id),
                        self.registry.session_count()
                    ),
                    timestamp: now,
                },
            ]);
        }

        if !self.registry.register_session(session_id, SessionInfo::new()) {
            return Err(DriverError::SessionAlreadyExists(session_id));
        }

        let ready = SessionReady {
            session_id: session_label(session_id),
            transport: self.config.transport_name.clone(),
        };

        Ok(vec![
            RelayAction::SendToSession { session_id, event: ServerEvent::Ready(ready) },
            RelayAction::Log {
                level: LogLevel::Debug,
                message: format!("session {} accepted", session_label(session_id)),
                timestamp: now,
            },
        ])
    }

    /// Replay the whole log to the requester only.
    fn handle_history_request(
        &mut self,
        session_id: u64,
    ) -> Result<Vec<RelayAction<E::Instant>>, DriverError> {
        let info = self
            .registry
            .session_mut(session_id)
            .ok_or(DriverError::SessionNotFound(session_id))?;
        info.history_requests += 1;

        let snapshot = self.log.snapshot();
        let count = snapshot.len();

        Ok(vec![
            RelayAction::SendToSession { session_id, event: ServerEvent::PreviousMessages(snapshot) },
            RelayAction::Log {
                level: LogLevel::Debug,
                message: format!(
                    "replayed {} entries to session {}",
                    count,
                    session_label(session_id)
                ),
                timestamp: self.env.now(),
            },
        ])
    }

    /// Append the payload verbatim, then broadcast it to every session.
    fn handle_message(
        &mut self,
        session_id: u64,
        message: ChatMessage,
    ) -> Result<Vec<RelayAction<E::Instant>>, DriverError> {
        let now = self.env.now();

        if !self.registry.has_session(session_id) {
            return Err(DriverError::SessionNotFound(session_id));
        }

        if self.config.payload_policy == PayloadPolicy::Strict && !message.is_well_formed() {
            return Ok(vec![RelayAction::Log {
                level: LogLevel::Warn,
                message: format!(
                    "dropped malformed message from session {}",
                    session_label(session_id)
                ),
                timestamp: now,
            }]);
        }

        if let Some(info) = self.registry.session_mut(session_id) {
            info.messages_sent += 1;
        }

        let line = format!("{}: {}", message.sender_name, message.text);
        self.log.append(message.clone());
        let recipients: Vec<u64> = self.registry.session_ids().collect();

        Ok(vec![
            RelayAction::Log { level: LogLevel::Info, message: line, timestamp: now },
            RelayAction::Broadcast { recipients, event: ServerEvent::Message(message) },
        ])
    }

    fn handle_session_closed(
        &mut self,
        session_id: u64,
        reason: &str,
    ) -> Vec<RelayAction<E::Instant>> {
        match self.registry.unregister_session(session_id) {
            Some(info) => vec![RelayAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "session {} closed: {}, served {} replays, sent {} messages",
                    session_label(session_id),
                    reason,
                    info.history_requests,
                    info.messages_sent
                ),
                timestamp: self.env.now(),
            }],
            None => Vec::new(),
        }
    }

    /// Read-only view of the message log.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Connected session ids in ascending order.
    pub fn session_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.registry.session_ids()
    }

    /// Session is connected.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.registry.has_session(session_id)
    }

    /// Bookkeeping for a connected session.
    pub fn session(&self, session_id: u64) -> Option<&SessionInfo> {
        self.registry.session(session_id)
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    /// Driver configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

impl<E> std::fmt::Debug for RelayDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDriver")
            .field("session_count", &self.registry.session_count())
            .field("log_len", &self.log.len())
            .finish_non_exhaustive()
    }
}
