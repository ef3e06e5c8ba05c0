//! Conversation transcript

use crate::llm::{Message, Role};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("expected a {expected} message, got {actual}")]
    OutOfOrder { expected: Role, actual: Role },
    #[error("no pending user message to roll back")]
    NothingToRollBack,
}

/// Ordered messages of the current session
///
/// Index 0 is always the system message. After it, roles alternate user,
/// assistant, user, ... Only [`History::push`] grows the transcript and it
/// refuses anything that would break the alternation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn system(&self) -> &Message {
        &self.messages[0]
    }

    /// Role the next appended message must have
    pub fn expected_role(&self) -> Role {
        match self.messages.last().map(|m| m.role) {
            Some(Role::User) => Role::Assistant,
            _ => Role::User,
        }
    }

    pub fn push(&mut self, message: Message) -> Result<(), HistoryError> {
        let expected = self.expected_role();
        if message.role != expected {
            return Err(HistoryError::OutOfOrder {
                expected,
                actual: message.role,
            });
        }
        self.messages.push(message);
        Ok(())
    }

    /// Drop a user message that never got an answer
    pub fn rollback_user(&mut self) -> Result<Message, HistoryError> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => self
                .messages
                .pop()
                .ok_or(HistoryError::NothingToRollBack),
            _ => Err(HistoryError::NothingToRollBack),
        }
    }

    /// The newest `n` messages after the system message, oldest first
    pub fn recent(&self, n: usize) -> &[Message] {
        let turns = &self.messages[1..];
        let start = turns.len().saturating_sub(n);
        &turns[start..]
    }

    /// Forget every turn, keeping the system message
    pub fn clear_turns(&mut self) {
        self.messages.truncate(1);
    }
}
