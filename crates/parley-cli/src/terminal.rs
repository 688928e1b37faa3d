//! Terminal driver for the chat client.
//!
//! Implements the [`Driver`] trait over crossterm key events and a
//! tokio-tungstenite WebSocket. Output is appended scrollback with the
//! composer redrawn on the last line; see [`crate::Transcript`].

use std::{
    io::{self, Write, stdout},
    time::Duration,
};

use crossterm::{
    ExecutableCommand, QueueableCommand,
    cursor::MoveToColumn,
    event::{
        Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    terminal::{
        Clear, ClearType, disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement,
    },
};
use futures::{SinkExt, Stream, StreamExt, stream::SplitSink};
use parley_app::{App, AppEvent, Driver, Timer};
use parley_proto::{ClientEvent, codec};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::{Message, protocol::WebSocketConfig},
};

use crate::{Transcript, TransportError, keys::convert_key, transcript::prompt_line};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Raw mode for the lifetime of the value.
///
/// Where the terminal supports it, escape codes are disambiguated so Shift
/// on Enter is reported.
pub struct RawModeGuard {
    enhanced: bool,
}

impl RawModeGuard {
    /// Enter raw mode.
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;

        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            stdout().execute(PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES,
            ))?;
        }

        Ok(Self { enhanced })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = stdout().execute(PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
    }
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// `S` is the terminal event source, crossterm's `EventStream` in the binary.
/// Channel events are tagged with the generation of the connection that
/// produced them; anything from a replaced connection is dropped.
pub struct TerminalDriver<S, W> {
    events: S,
    internal_tx: mpsc::UnboundedSender<(u64, AppEvent)>,
    internal_rx: mpsc::UnboundedReceiver<(u64, AppEvent)>,
    sink: Option<WsSink>,
    generation: u64,
    transcript: Transcript,
    out: W,
}

impl<S, W> TerminalDriver<S, W>
where
    S: Stream<Item = io::Result<Event>> + Unpin + Send,
    W: Write + Send,
{
    /// Create a driver reading `events` and writing scrollback to `out`.
    pub fn new(events: S, out: W) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        Self {
            events,
            internal_tx,
            internal_rx,
            sink: None,
            generation: 0,
            transcript: Transcript::new(),
            out,
        }
    }

    /// Scrollback writer.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Write `lines` above the composer, then redraw the composer.
    fn write_lines(&mut self, lines: &[String], input: &str) -> io::Result<()> {
        self.out.queue(MoveToColumn(0))?.queue(Clear(ClearType::CurrentLine))?;
        for line in lines {
            // Raw mode: no implicit carriage return
            write!(self.out, "{line}\r\n")?;
        }
        write!(self.out, "{}", prompt_line(input))?;
        self.out.flush()
    }
}

impl<S, W> Driver for TerminalDriver<S, W>
where
    S: Stream<Item = io::Result<Event>> + Unpin + Send,
    W: Write + Send,
{
    type Error = TransportError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, TransportError> {
        loop {
            let current = self.generation;

            tokio::select! {
                biased;

                internal = self.internal_rx.recv() => {
                    // Timers carry generation 0 and always apply.
                    if let Some((generation, event)) = internal
                        && (generation == 0 || generation == current)
                    {
                        return Ok(Some(event));
                    }
                },
                event = self.events.next() => match event {
                    Some(Ok(Event::Key(key))) => {
                        if let Some(key) = convert_key(key) {
                            return Ok(Some(AppEvent::Key(key)));
                        }
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(TransportError::Io(e)),
                    None => return Ok(None),
                },
            }
        }
    }

    async fn connect(&mut self, server_addr: &str) -> Result<String, TransportError> {
        // Replays carry the whole log in one frame
        let config = WebSocketConfig::default().max_message_size(None).max_frame_size(None);
        let (ws, _response) = connect_async_with_config(server_addr, Some(config), false).await?;
        let (sink, mut stream) = ws.split();

        self.generation += 1;
        let generation = self.generation;
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        match codec::decode_server_event(text.as_str()) {
                            Ok(event) => {
                                if tx.send((generation, AppEvent::from(event))).is_err() {
                                    return;
                                }
                            },
                            Err(e) => tracing::warn!("dropping relay frame: {}", e),
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "relay closed the channel".to_string());
                    },
                    None => break "relay closed the channel".to_string(),
                    Some(Ok(_)) => {},
                    Some(Err(e)) => break e.to_string(),
                }
            };
            tracing::debug!("channel {} ended: {}", generation, reason);
            let _ = tx.send((generation, AppEvent::Disconnected { reason }));
        });

        self.sink = Some(sink);
        tracing::info!("connected to {}", server_addr);
        Ok("websocket".to_string())
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        let sink = self.sink.as_mut().ok_or(TransportError::NotConnected)?;
        let text = codec::encode_client_event(&event)?;
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    fn start_timer(&mut self, timer: Timer, delay: Duration) {
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send((0, AppEvent::TimerFired(timer)));
        });
    }

    fn render(&mut self, app: &App) -> Result<(), TransportError> {
        let lines = self.transcript.update(app);
        self.write_lines(&lines, app.input())?;
        Ok(())
    }

    fn redirect_to_name_entry(&mut self) -> Result<(), TransportError> {
        write!(self.out, "No display name stored. Run again with --name <NAME>.\r\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn stop(&mut self) {
        self.sink = None;
        self.generation += 1;
        let _ = write!(self.out, "\r\n").and_then(|()| self.out.flush());
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use futures::channel::mpsc as event_channel;
    use parley_app::{AppConfig, KeyInput};
    use parley_core::identity::ClientIdentity;
    use parley_proto::ChatMessage;

    use super::*;

    type Events = event_channel::UnboundedReceiver<io::Result<Event>>;

    type EventSender = event_channel::UnboundedSender<io::Result<Event>>;

    fn driver() -> (TerminalDriver<Events, Vec<u8>>, EventSender) {
        let (tx, rx) = event_channel::unbounded();
        (TerminalDriver::new(rx, Vec::new()), tx)
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> io::Result<Event> {
        Ok(Event::Key(KeyEvent::new(code, modifiers)))
    }

    fn output(driver: &TerminalDriver<Events, Vec<u8>>) -> String {
        String::from_utf8_lossy(driver.output()).into_owned()
    }

    #[tokio::test]
    async fn key_events_become_app_keys() {
        let (mut driver, tx) = driver();
        tx.unbounded_send(key(KeyCode::Char('h'), KeyModifiers::NONE)).unwrap();
        tx.unbounded_send(key(KeyCode::Enter, KeyModifiers::SHIFT)).unwrap();

        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::Key(KeyInput::Char('h'))));
        assert_eq!(
            driver.poll_event().await.unwrap(),
            Some(AppEvent::Key(KeyInput::Enter { shift: true }))
        );
    }

    #[tokio::test]
    async fn non_key_events_are_skipped() {
        let (mut driver, tx) = driver();
        tx.unbounded_send(Ok(Event::Resize(80, 24))).unwrap();
        tx.unbounded_send(key(KeyCode::Tab, KeyModifiers::NONE)).unwrap();
        tx.unbounded_send(key(KeyCode::Esc, KeyModifiers::NONE)).unwrap();

        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::Key(KeyInput::Esc)));
    }

    #[tokio::test]
    async fn closed_event_source_ends_input() {
        let (mut driver, tx) = driver();
        drop(tx);

        assert_eq!(driver.poll_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn terminal_read_error_is_fatal() {
        let (mut driver, tx) = driver();
        tx.unbounded_send(Err(io::Error::other("tty gone"))).unwrap();

        assert!(matches!(driver.poll_event().await, Err(TransportError::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_through_poll() {
        let (mut driver, _tx) = driver();
        driver.start_timer(Timer::Reconnect, Duration::from_secs(2));

        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::TimerFired(Timer::Reconnect)));
    }

    #[tokio::test]
    async fn stale_channel_events_are_dropped() {
        let (mut driver, tx) = driver();
        driver.generation = 2;
        driver.internal_tx.send((1, AppEvent::Disconnected { reason: "old".into() })).unwrap();
        tx.unbounded_send(key(KeyCode::Enter, KeyModifiers::NONE)).unwrap();

        assert_eq!(
            driver.poll_event().await.unwrap(),
            Some(AppEvent::Key(KeyInput::Enter { shift: false }))
        );
    }

    #[tokio::test]
    async fn send_without_channel_fails() {
        let (mut driver, _tx) = driver();

        let result = driver.send(ClientEvent::GetPreviousMessages).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[test]
    fn render_appends_scrollback_and_prompt() {
        let (mut driver, _tx) = driver();
        let mut app = App::new(AppConfig::default());
        app.mount(Some(ClientIdentity::new("u1", "Alice")));
        app.handle(AppEvent::Connected { transport: "websocket".into() });
        app.handle(AppEvent::Ready { session_id: "01".into(), transport: "websocket".into() });
        app.handle(AppEvent::HistoryReceived(vec![ChatMessage::new("hi", "Alice", "u1")]));
        app.handle(AppEvent::Key(KeyInput::Char('y')));

        driver.render(&app).unwrap();

        let out = output(&driver);
        assert!(out.contains("You: hi\r\n"));
        assert!(out.ends_with("> y"));
    }

    #[test]
    fn redirect_points_at_name_flag() {
        let (mut driver, _tx) = driver();
        driver.redirect_to_name_entry().unwrap();

        assert!(output(&driver).contains("--name"));
    }
}
