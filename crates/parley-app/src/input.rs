//! Terminal-agnostic keyboard input.

/// Keyboard input abstraction.
///
/// Decouples the composer from terminal libraries so key handling can be
/// driven from tests and simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key. With Shift held it inserts a newline instead of
    /// submitting.
    Enter {
        /// Shift modifier held.
        shift: bool,
    },
    /// Backspace key (delete last character).
    Backspace,
    /// Escape key (leave the chat).
    Esc,
}
