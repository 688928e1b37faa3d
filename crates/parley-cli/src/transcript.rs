//! Scrollback rendering.
//!
//! A line terminal cannot redraw, so [`Transcript`] remembers how much it
//! already printed and turns each new [`App`] state into the lines to append.
//! The view only grows, except once: when the history replay replaces it, the
//! whole log is printed again under a separator.

use parley_app::App;
use parley_proto::ChatMessage;

/// Label shown instead of the sender name on this client's own messages.
pub const OWN_LABEL: &str = "You";

/// Shown once the view is loaded but holds no messages.
pub const EMPTY_PLACEHOLDER: &str = "No messages yet. Say hello!";

/// Printed-so-far state of the scrollback.
#[derive(Debug, Default)]
pub struct Transcript {
    printed: usize,
    history_seen: bool,
    status: Option<String>,
    placeholder_shown: bool,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to append so the scrollback reflects `app`.
    pub fn update(&mut self, app: &App) -> Vec<String> {
        let mut lines = Vec::new();

        let status = app.status_message();
        if status != self.status.as_deref() {
            if let Some(status) = status {
                lines.push(format!("* {status}"));
            }
            self.status = status.map(str::to_string);
        }

        let messages = app.messages();
        let replaced = app.history_received() && !self.history_seen;
        if replaced {
            self.history_seen = true;
            if self.printed > 0 {
                lines.push("--- history ---".to_string());
            }
            self.printed = 0;
        }

        for message in messages.get(self.printed..).unwrap_or_default() {
            lines.extend(format_message(app, message));
        }
        self.printed = messages.len();

        if messages.is_empty() && app.phase().is_connected() && !self.placeholder_shown {
            lines.push(EMPTY_PLACEHOLDER.to_string());
            self.placeholder_shown = true;
        }

        lines
    }
}

/// Composer line shown under the scrollback. Newlines in the draft show as
/// `↵`.
pub fn prompt_line(input: &str) -> String {
    format!("> {}", input.replace('\n', " ↵ "))
}

/// Message as scrollback lines. Continuation lines are indented under the
/// sender label.
pub fn format_message(app: &App, message: &ChatMessage) -> Vec<String> {
    let label = if app.is_own(message) { OWN_LABEL } else { message.sender_name.as_str() };

    let mut text_lines = message.text.split('\n');
    let first = text_lines.next().unwrap_or_default();
    let indent = " ".repeat(label.chars().count() + 2);

    let mut lines = vec![format!("{label}: {first}")];
    lines.extend(text_lines.map(|line| format!("{indent}{line}")));
    lines
}
