//! Crossterm key events to composer keystrokes.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parley_app::KeyInput;

/// Convert a crossterm key event to a [`KeyInput`].
///
/// Releases are ignored. Raw mode swallows SIGINT, so Ctrl+C and Ctrl+D leave
/// the view like Esc. Alt+Enter inserts a newline like Shift+Enter, for
/// terminals that cannot report Shift on Enter.
pub fn convert_key(event: KeyEvent) -> Option<KeyInput> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

    match event.code {
        KeyCode::Char('c' | 'd') if ctrl => Some(KeyInput::Esc),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter {
            shift: event.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT),
        }),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Esc => Some(KeyInput::Esc),
        _ => None,
    }
}
