//! Application state machine.
//!
//! [`App`] is one mounted chat view. It is a pure state machine: it consumes
//! [`crate::AppEvent`] inputs and produces [`crate::AppAction`] instructions
//! for the runtime to execute. No I/O, no clock.
//!
//! # Responsibilities
//!
//! - Lifecycle: mount, connect, reconnect, unmount.
//! - Requests the history replay exactly once per instance.
//! - Keeps the local message view: replaced by the replay, appended to by
//!   broadcasts.
//! - Owns the composer and guards submission.

use parley_core::identity::ClientIdentity;
use parley_proto::{ChatMessage, ClientEvent};

use crate::{
    AppAction, AppConfig, AppEvent, ConnectionState, HistoryTrigger, KeyInput, Phase, Timer,
};

/// Chat view state machine.
#[derive(Debug, Clone)]
pub struct App {
    config: AppConfig,
    phase: Phase,
    connection: ConnectionState,
    identity: Option<ClientIdentity>,
    /// Session id from the relay's last `ready`.
    session_id: Option<String>,
    messages: Vec<ChatMessage>,
    input: String,
    status_message: Option<String>,
    /// Set when `getPreviousMessages` goes out. Never cleared.
    history_requested: bool,
    history_received: bool,
}

impl App {
    /// Create an unmounted view.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            phase: Phase::Uninitialized,
            connection: ConnectionState::Disconnected,
            identity: None,
            session_id: None,
            messages: Vec::new(),
            input: String::new(),
            status_message: None,
            history_requested: false,
            history_received: false,
        }
    }

    /// Mount the view with the stored identity.
    ///
    /// Without an identity the view redirects to name entry and closes
    /// without connecting.
    pub fn mount(&mut self, identity: Option<ClientIdentity>) -> Vec<AppAction> {
        if self.phase != Phase::Uninitialized {
            return vec![];
        }

        match identity {
            None => {
                self.phase = Phase::Closed;
                self.status_message = Some("Choose a display name first".to_string());
                vec![AppAction::RedirectToNameEntry]
            },
            Some(identity) => {
                self.identity = Some(identity);
                self.begin_connect()
            },
        }
    }

    /// Unmount the view. Later events are ignored.
    pub fn unmount(&mut self) -> Vec<AppAction> {
        if self.phase == Phase::Closed {
            return vec![];
        }

        self.phase = Phase::Closed;
        self.connection = ConnectionState::Disconnected;
        vec![AppAction::Release]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        if matches!(self.phase, Phase::Uninitialized | Phase::Closed) {
            return vec![];
        }

        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Connected { transport } => match self.on_connected(transport) {
                Some(mut actions) => {
                    actions.push(AppAction::Render);
                    actions
                },
                None => vec![],
            },
            AppEvent::Ready { session_id, transport } => self.on_ready(session_id, transport),
            AppEvent::HistoryReceived(entries) => self.on_history(entries),
            AppEvent::MessageReceived(message) => {
                if !self.phase.is_connected() {
                    tracing::debug!("dropping message received while {:?}", self.phase);
                    return vec![];
                }
                self.messages.push(message);
                vec![AppAction::Render]
            },
            AppEvent::Disconnected { reason } => self.on_disconnected(reason),
            AppEvent::TimerFired(timer) => self.on_timer(timer),
        }
    }

    /// Submit the composer contents.
    ///
    /// No-op unless the trimmed input is non-empty, an identity is set and
    /// the channel is open. The untrimmed input is sent.
    pub fn submit(&mut self) -> Vec<AppAction> {
        if !self.phase.is_connected() || self.input.trim().is_empty() {
            return vec![];
        }
        let Some(identity) = &self.identity else {
            return vec![];
        };

        let text = std::mem::take(&mut self.input);
        let message = identity.compose(text);
        vec![AppAction::Send(ClientEvent::Message(message)), AppAction::Render]
    }

    fn begin_connect(&mut self) -> Vec<AppAction> {
        self.phase = Phase::Connecting;
        self.connection = ConnectionState::Connecting;
        self.status_message = Some(format!("Connecting to {}", self.config.server_addr));
        vec![AppAction::Connect { server_addr: self.config.server_addr.clone() }, AppAction::Render]
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Char(c) => self.input.push(c),
            KeyInput::Enter { shift: true } => self.input.push('\n'),
            KeyInput::Enter { shift: false } => return self.submit(),
            KeyInput::Backspace => {
                if self.input.pop().is_none() {
                    return vec![];
                }
            },
            KeyInput::Esc => return self.unmount(),
        }
        vec![AppAction::Render]
    }

    /// `None` if the event is stale. Callers append `Render`.
    fn on_connected(&mut self, transport: String) -> Option<Vec<AppAction>> {
        if self.phase != Phase::Connecting {
            tracing::debug!("ignoring channel open while {:?}", self.phase);
            return None;
        }

        self.status_message = Some(format!("Connected via {transport}"));
        self.connection = ConnectionState::Connected { transport };

        if self.history_requested {
            self.phase = Phase::Live;
            return Some(vec![]);
        }

        self.phase = Phase::AwaitingHistory;
        Some(match self.config.history_trigger {
            HistoryTrigger::ReadyAck => vec![],
            HistoryTrigger::SettleDelay(delay) => {
                vec![AppAction::StartTimer { timer: Timer::Settle, delay }]
            },
        })
    }

    fn on_ready(&mut self, session_id: String, transport: String) -> Vec<AppAction> {
        let mut actions = Vec::new();

        // Some transports only surface the relay's ack, not the open itself
        if self.phase == Phase::Connecting
            && let Some(opened) = self.on_connected(transport.clone())
        {
            actions.extend(opened);
        }

        if !self.phase.is_connected() {
            return vec![];
        }

        self.session_id = Some(session_id);
        self.connection = ConnectionState::Connected { transport };

        if self.config.history_trigger == HistoryTrigger::ReadyAck {
            actions.extend(self.request_history());
        }

        actions.push(AppAction::Render);
        actions
    }

    fn request_history(&mut self) -> Vec<AppAction> {
        if self.history_requested || self.phase != Phase::AwaitingHistory {
            return vec![];
        }

        self.history_requested = true;
        self.status_message = Some("Loading history".to_string());
        vec![AppAction::Send(ClientEvent::GetPreviousMessages)]
    }

    fn on_history(&mut self, entries: Vec<ChatMessage>) -> Vec<AppAction> {
        if self.history_received || !self.phase.is_connected() {
            tracing::debug!("ignoring unexpected history replay");
            return vec![];
        }

        self.history_received = true;
        self.messages = entries;
        if self.phase == Phase::AwaitingHistory {
            self.phase = Phase::Live;
        }
        self.status_message = None;
        vec![AppAction::Render]
    }

    fn on_disconnected(&mut self, reason: String) -> Vec<AppAction> {
        if !matches!(self.phase, Phase::Connecting | Phase::AwaitingHistory | Phase::Live) {
            return vec![];
        }

        self.phase = Phase::Disconnected;
        self.connection = ConnectionState::Disconnected;
        self.session_id = None;
        self.status_message = Some(format!("Disconnected: {reason}"));

        let mut actions = vec![AppAction::Render];
        if let Some(delay) = self.config.reconnect_delay {
            actions.push(AppAction::StartTimer { timer: Timer::Reconnect, delay });
        }
        actions
    }

    fn on_timer(&mut self, timer: Timer) -> Vec<AppAction> {
        match timer {
            Timer::Settle => {
                if !matches!(self.config.history_trigger, HistoryTrigger::SettleDelay(_)) {
                    return vec![];
                }
                let mut actions = self.request_history();
                if !actions.is_empty() {
                    actions.push(AppAction::Render);
                }
                actions
            },
            Timer::Reconnect => {
                if self.phase != Phase::Disconnected {
                    return vec![];
                }
                self.begin_connect()
            },
        }
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Connection status.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection
    }

    /// Transport name while connected.
    pub fn transport(&self) -> Option<&str> {
        match &self.connection {
            ConnectionState::Connected { transport } => Some(transport),
            _ => None,
        }
    }

    /// Session id from the relay's acknowledgment, while connected.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Local message view, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Message was sent by this client's identity.
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        self.identity.as_ref().is_some_and(|identity| identity.is_own(message))
    }

    /// Current composer contents.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Identity given at mount.
    pub fn identity(&self) -> Option<&ClientIdentity> {
        self.identity.as_ref()
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// History replay was requested by this instance.
    pub fn history_requested(&self) -> bool {
        self.history_requested
    }

    /// The replay has replaced the view. Happens at most once per instance.
    pub fn history_received(&self) -> bool {
        self.history_received
    }

    /// Relay address.
    pub fn server_addr(&self) -> &str {
        &self.config.server_addr
    }
}
