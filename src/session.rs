//! Conversation state for one chat session.
//!
//! [`SessionState`] owns the ordered history of [`Turn`]s and the current
//! system instruction.  The append operations are crate-private: the stream
//! coordinator is the only writer, and it appends only after a cycle has
//! completed.  Everyone else reads snapshots.

use crate::types::{AttachmentRef, Turn};

/// History and system instruction of a chat session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    history: Vec<Turn>,
    system_instruction: String,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty session with a system instruction.
    pub fn with_system_instruction(system_instruction: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            system_instruction: system_instruction.into(),
        }
    }

    pub(crate) fn append_user_turn(&mut self, text: impl Into<String>) {
        self.history.push(Turn::user(text));
    }

    pub(crate) fn append_model_turn(&mut self, text: impl Into<String>) {
        self.history.push(Turn::model(text));
    }

    /// Records a reviewed attachment.  Only the command text is kept; the
    /// reference is consumed by the outgoing message.
    pub(crate) fn append_attachment_turn(&mut self, reference: &AttachmentRef, command: &str) {
        tracing::debug!(uri = reference.uri(), "recording attachment turn");
        self.history.push(Turn::user(command));
    }

    /// Returns a copy of the history.
    pub fn history(&self) -> Vec<Turn> {
        self.history.clone()
    }

    /// Replaces the system instruction used by later cycles.
    pub fn set_system_instruction(&mut self, text: impl Into<String>) {
        self.system_instruction = text.into();
    }

    /// Returns the current system instruction.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Number of turns in the history.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if no turn has been committed.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drops the whole history.  The system instruction is kept.
    pub(crate) fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn new_session_empty() {
        let session = SessionState::new();
        assert_eq!(session.len(), 0);
        assert!(session.is_empty());
        assert_eq!(session.system_instruction(), "");
    }

    #[test]
    fn appends_keep_order() {
        let mut session = SessionState::new();
        session.append_user_turn("hi");
        session.append_model_turn("hello");
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[1].text(), Some("hello"));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut session = SessionState::new();
        session.append_user_turn("one");
        let snapshot = session.history();
        session.append_model_turn("two");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn attachment_turn_keeps_only_command() {
        let mut session = SessionState::new();
        let reference = AttachmentRef::new("files/abc123", "text/plain");
        session.append_attachment_turn(&reference, "review files/abc123");
        let history = session.history();
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].text(), Some("review files/abc123"));
        assert!(history[0].content().as_attachment().is_none());
    }

    #[test]
    fn system_instruction_does_not_touch_history() {
        let mut session = SessionState::with_system_instruction("be terse");
        session.append_user_turn("q");
        session.append_model_turn("a");
        let before = session.history();
        session.set_system_instruction("X");
        assert_eq!(session.system_instruction(), "X");
        assert_eq!(session.history(), before);
    }

    #[test]
    fn reset_keeps_instruction() {
        let mut session = SessionState::with_system_instruction("keep");
        session.append_user_turn("q");
        session.reset();
        assert!(session.is_empty());
        assert_eq!(session.system_instruction(), "keep");
    }
}
