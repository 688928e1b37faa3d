//! Append-only message log.
//!
//! The log is the relay's only durable-for-the-process state. It starts with a
//! single seed entry and grows by exactly one entry per accepted message.
//! Entries are never mutated, removed or reordered, so a log index handed out
//! by [`MessageLog::append`] names the same message for the lifetime of the
//! process.
//!
//! The only mutating operation is [`MessageLog::append`]; readers get either a
//! borrowed view or an owned [`MessageLog::snapshot`].

use parley_proto::ChatMessage;

/// Ordered, append-only sequence of chat messages.
///
/// # Invariants
///
/// - Never empty: index 0 is the seed entry.
/// - Once appended, an entry's content and index never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
}

impl MessageLog {
    /// Create a log whose only entry is `seed`.
    pub fn seeded(seed: ChatMessage) -> Self {
        Self { entries: vec![seed] }
    }

    /// Append a message and return its log index.
    pub fn append(&mut self, message: ChatMessage) -> u64 {
        let index = self.entries.len() as u64;
        self.entries.push(message);
        index
    }

    /// Owned copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.entries.clone()
    }

    /// Entry at `index`. `None` past the end.
    pub fn get(&self, index: u64) -> Option<&ChatMessage> {
        usize::try_from(index).ok().and_then(|i| self.entries.get(i))
    }

    /// The seed entry.
    pub fn seed(&self) -> &ChatMessage {
        // Index 0 is populated at construction and never removed.
        &self.entries[0]
    }

    /// Number of entries, seed included. Always at least 1.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::seeded(ChatMessage::welcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_holds_only_the_welcome_entry() {
        let log = MessageLog::default();

        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
        assert_eq!(log.seed(), &ChatMessage::welcome());
    }

    #[test]
    fn append_returns_consecutive_indices() {
        let mut log = MessageLog::default();

        assert_eq!(log.append(ChatMessage::new("a", "Alice", "u1")), 1);
        assert_eq!(log.append(ChatMessage::new("b", "Bob", "u2")), 2);
        assert_eq!(log.get(1).map(|m| m.text.as_str()), Some("a"));
        assert_eq!(log.get(2).map(|m| m.text.as_str()), Some("b"));
        assert_eq!(log.get(3), None);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut log = MessageLog::default();
        let before = log.snapshot();

        log.append(ChatMessage::new("later", "Alice", "u1"));

        assert_eq!(before.len(), 1);
        assert_eq!(log.snapshot().len(), 2);
        assert_eq!(log.snapshot()[0], before[0]);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut log = MessageLog::default();
        let msg = ChatMessage::new("same", "Alice", "u1");

        log.append(msg.clone());
        log.append(msg.clone());

        assert_eq!(log.iter().filter(|m| **m == msg).count(), 2);
    }
}
