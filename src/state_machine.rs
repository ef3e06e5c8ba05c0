//! Turn state machine
//!
//! A conversation is either idle or handling exactly one request. The
//! transition function is pure; the engine applies its result.

#[cfg(test)]
mod proptests;

use thiserror::Error;

/// Where the conversation is between turns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    TurnActive {
        request: String,
    },
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }
}

/// How an active turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    /// A tool produced a reply
    Replied,
    /// The terminator was selected
    Terminated,
    /// The gateway failed; nothing was recorded
    Failed,
}

/// Events that drive the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Request { text: String },
    Finished(TurnEnd),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("request is empty")]
    EmptyRequest,
    #[error("a turn is already being handled")]
    TurnInProgress,
    #[error("no turn is active")]
    NoActiveTurn,
}

/// Pure transition function
pub fn transition(state: &TurnState, event: TurnEvent) -> Result<TurnState, TransitionError> {
    match (state, event) {
        (TurnState::Idle, TurnEvent::Request { text }) => {
            if text.trim().is_empty() {
                Err(TransitionError::EmptyRequest)
            } else {
                Ok(TurnState::TurnActive { request: text })
            }
        }
        (TurnState::TurnActive { .. }, TurnEvent::Request { .. }) => {
            Err(TransitionError::TurnInProgress)
        }
        // Every way out of a turn lands in Idle
        (TurnState::TurnActive { .. }, TurnEvent::Finished(_)) => Ok(TurnState::Idle),
        (TurnState::Idle, TurnEvent::Finished(_)) => Err(TransitionError::NoActiveTurn),
    }
}
