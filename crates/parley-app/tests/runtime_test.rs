//! Runtime tests against a scripted driver.
//!
//! # Oracle Pattern
//!
//! Each test scripts the driver's events, runs the runtime to completion and
//! checks what the driver was asked to do plus the final app view.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use parley_app::{
    App, AppConfig, AppEvent, Driver, HistoryTrigger, KeyInput, Phase, Runtime, Timer,
};
use parley_core::identity::ClientIdentity;
use parley_proto::{ChatMessage, ClientEvent};

#[derive(Debug)]
struct ScriptError(String);

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ScriptError {}

/// Everything the runtime asked the driver to do.
#[derive(Debug, Default)]
struct Record {
    connects: Vec<String>,
    sent: Vec<ClientEvent>,
    timers: Vec<(Timer, Duration)>,
    renders: usize,
    redirected: bool,
    stopped: bool,
}

struct ScriptedDriver {
    script: VecDeque<AppEvent>,
    connect_results: VecDeque<Result<String, String>>,
    fail_sends: bool,
    record: Arc<Mutex<Record>>,
}

impl ScriptedDriver {
    fn new(script: Vec<AppEvent>) -> (Self, Arc<Mutex<Record>>) {
        let record = Arc::new(Mutex::new(Record::default()));
        let driver = Self {
            script: script.into(),
            connect_results: VecDeque::new(),
            fail_sends: false,
            record: Arc::clone(&record),
        };
        (driver, record)
    }
}

impl Driver for ScriptedDriver {
    type Error = ScriptError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, ScriptError> {
        Ok(self.script.pop_front())
    }

    async fn connect(&mut self, server_addr: &str) -> Result<String, ScriptError> {
        self.record.lock().unwrap().connects.push(server_addr.to_string());
        match self.connect_results.pop_front() {
            Some(Err(reason)) => Err(ScriptError(reason)),
            Some(Ok(transport)) => Ok(transport),
            None => Ok("websocket".to_string()),
        }
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), ScriptError> {
        if self.fail_sends {
            return Err(ScriptError("broken pipe".to_string()));
        }
        self.record.lock().unwrap().sent.push(event);
        Ok(())
    }

    fn start_timer(&mut self, timer: Timer, delay: Duration) {
        self.record.lock().unwrap().timers.push((timer, delay));
    }

    fn render(&mut self, _app: &App) -> Result<(), ScriptError> {
        self.record.lock().unwrap().renders += 1;
        Ok(())
    }

    fn redirect_to_name_entry(&mut self) -> Result<(), ScriptError> {
        self.record.lock().unwrap().redirected = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.record.lock().unwrap().stopped = true;
    }
}

fn config() -> AppConfig {
    AppConfig {
        server_addr: "ws://relay:4000".to_string(),
        history_trigger: HistoryTrigger::ReadyAck,
        reconnect_delay: Some(Duration::from_millis(250)),
    }
}

fn ready() -> AppEvent {
    AppEvent::Ready { session_id: "0000000000000001".into(), transport: "websocket".into() }
}

fn keys(text: &str) -> Vec<AppEvent> {
    let mut events: Vec<AppEvent> = text.chars().map(|c| AppEvent::Key(KeyInput::Char(c))).collect();
    events.push(AppEvent::Key(KeyInput::Enter { shift: false }));
    events
}

#[tokio::test]
async fn missing_identity_redirects_without_connecting() {
    let (driver, record) = ScriptedDriver::new(vec![ready()]);

    let app = Runtime::new(driver, config()).run(None).await.unwrap();

    let record = record.lock().unwrap();
    assert!(record.redirected);
    assert!(record.connects.is_empty());
    assert!(record.sent.is_empty());
    assert!(record.stopped);
    assert_eq!(app.phase(), Phase::Closed);
}

#[tokio::test]
async fn full_session_requests_history_and_sends() {
    let mut script = vec![
        ready(),
        AppEvent::HistoryReceived(vec![ChatMessage::welcome()]),
    ];
    script.extend(keys("hi"));
    script.push(AppEvent::MessageReceived(ChatMessage::new("hi", "Alice", "u1")));

    let (driver, record) = ScriptedDriver::new(script);
    let app = Runtime::new(driver, config())
        .run(Some(ClientIdentity::new("u1", "Alice")))
        .await
        .unwrap();

    let record = record.lock().unwrap();
    assert_eq!(record.connects, vec!["ws://relay:4000".to_string()]);
    assert_eq!(record.sent, vec![
        ClientEvent::GetPreviousMessages,
        ClientEvent::Message(ChatMessage::new("hi", "Alice", "u1")),
    ]);
    assert!(record.renders > 0);

    // Script ran out, so the runtime unmounted the view
    assert_eq!(app.phase(), Phase::Closed);
    assert_eq!(app.messages(), &[
        ChatMessage::welcome(),
        ChatMessage::new("hi", "Alice", "u1")
    ]);
    assert!(app.is_own(&app.messages()[1]));
}

#[tokio::test]
async fn failed_connect_schedules_reconnect() {
    let script = vec![AppEvent::TimerFired(Timer::Reconnect), ready()];
    let (mut driver, record) = ScriptedDriver::new(script);
    driver.connect_results.push_back(Err("connection refused".to_string()));

    let app = Runtime::new(driver, config())
        .run(Some(ClientIdentity::new("u1", "Alice")))
        .await
        .unwrap();

    let record = record.lock().unwrap();
    assert_eq!(record.connects.len(), 2);
    assert_eq!(record.timers, vec![(Timer::Reconnect, Duration::from_millis(250))]);
    assert_eq!(record.sent, vec![ClientEvent::GetPreviousMessages]);
    assert!(app.history_requested());
}

#[tokio::test]
async fn history_is_requested_once_across_reconnects() {
    let script = vec![
        ready(),
        AppEvent::Disconnected { reason: "reset".into() },
        AppEvent::TimerFired(Timer::Reconnect),
        ready(),
        AppEvent::Disconnected { reason: "reset".into() },
        AppEvent::TimerFired(Timer::Reconnect),
        ready(),
    ];
    let (driver, record) = ScriptedDriver::new(script);

    Runtime::new(driver, config())
        .run(Some(ClientIdentity::new("u1", "Alice")))
        .await
        .unwrap();

    let record = record.lock().unwrap();
    assert_eq!(record.connects.len(), 3);
    let requests =
        record.sent.iter().filter(|e| **e == ClientEvent::GetPreviousMessages).count();
    assert_eq!(requests, 1);
}

#[tokio::test]
async fn failed_send_is_a_disconnect() {
    let mut script = vec![ready()];
    script.extend(keys("hello"));
    let (mut driver, record) = ScriptedDriver::new(script);
    driver.fail_sends = true;

    let app = Runtime::new(driver, AppConfig { reconnect_delay: None, ..config() })
        .run(Some(ClientIdentity::new("u1", "Alice")))
        .await
        .unwrap();

    let record = record.lock().unwrap();
    assert!(record.sent.is_empty());
    assert!(record.timers.is_empty());
    // The history request failed and flipped the view to disconnected, so
    // typing never produced a submit
    assert!(app.history_requested());
    assert_eq!(app.input(), "hello");
}

#[tokio::test]
async fn settle_delay_trigger_uses_a_timer() {
    let delay = Duration::from_millis(200);
    let script = vec![
        ready(),
        AppEvent::TimerFired(Timer::Settle),
        AppEvent::HistoryReceived(vec![ChatMessage::welcome()]),
    ];
    let (driver, record) = ScriptedDriver::new(script);

    let app = Runtime::new(driver, AppConfig {
        history_trigger: HistoryTrigger::SettleDelay(delay),
        ..config()
    })
    .run(Some(ClientIdentity::new("u1", "Alice")))
    .await
    .unwrap();

    let record = record.lock().unwrap();
    assert_eq!(record.timers, vec![(Timer::Settle, delay)]);
    assert_eq!(record.sent, vec![ClientEvent::GetPreviousMessages]);
    assert_eq!(app.messages(), &[ChatMessage::welcome()]);
}

#[tokio::test]
async fn esc_ends_the_run_early() {
    let script = vec![
        ready(),
        AppEvent::Key(KeyInput::Esc),
        AppEvent::MessageReceived(ChatMessage::new("late", "Bob", "u2")),
    ];
    let (driver, record) = ScriptedDriver::new(script);

    let app = Runtime::new(driver, config())
        .run(Some(ClientIdentity::new("u1", "Alice")))
        .await
        .unwrap();

    assert!(record.lock().unwrap().stopped);
    assert!(app.messages().is_empty());
}
