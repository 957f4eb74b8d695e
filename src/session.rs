//! Conversation session manager
//!
//! Elm-style core: a pure `transition` over the conversation state yields
//! effects that the [`SessionController`] executes.

mod controller;
mod effect;
mod event;
mod latency;
mod request;
mod state;
mod transition;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use controller::{SessionController, SessionSnapshot, TurnOutcome};
pub use effect::Effect;
pub use event::Event;
pub use latency::LatencyPolicy;
pub use state::{
    InvalidState, RejectReason, SessionContext, DEFAULT_GREETING, DEFAULT_TERMINATION_MARKER,
};
pub use transition::{transition, TransitionError};

use crate::llm::CompletionError;
use crate::persona::PersonaNotFound;
use thiserror::Error;

/// Errors surfaced by the controller's entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Caller tried to act while the session cannot accept it; nothing changed
    #[error("input rejected: {0}")]
    InputRejected(RejectReason),
    /// Contract violation; indicates a bug in the caller or the session
    #[error("invalid session state: {0}")]
    InvalidState(#[from] InvalidState),
    #[error(transparent)]
    NotFound(#[from] PersonaNotFound),
    /// Recoverable: the session stays active and the user may resubmit
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}

impl From<TransitionError> for SessionError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::InputRejected(reason) => Self::InputRejected(reason),
            TransitionError::InvalidState(inner) => Self::InvalidState(inner),
            TransitionError::Stale(tag) => {
                Self::InvalidState(InvalidState::UnexpectedCompletion(tag))
            }
        }
    }
}

impl SessionError {
    /// Stable machine-readable category
    pub fn category(&self) -> &'static str {
        match self {
            Self::InputRejected(_) => "input_rejected",
            Self::InvalidState(_) => "invalid_state",
            Self::NotFound(_) => "not_found",
            Self::Completion(e) => e.kind().category(),
        }
    }

    /// Whether the user can simply try again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Completion(_) | Self::InputRejected(_))
    }

    /// Human-readable message for the chat UI
    pub fn user_message(&self) -> String {
        match self {
            Self::InputRejected(reason) => match reason {
                RejectReason::NoPersonaSelected => {
                    "Please select a condition before sending a message.".to_string()
                }
                RejectReason::Closed => {
                    "This conversation has ended. Select a condition to start again.".to_string()
                }
                RejectReason::AwaitingReply => {
                    "Please wait for the reply to your previous message.".to_string()
                }
                RejectReason::SwitchingDisabled => {
                    "Switching conditions is not available here.".to_string()
                }
            },
            Self::InvalidState(_) => {
                "An unexpected internal error occurred. Please report this.".to_string()
            }
            Self::NotFound(e) => format!("Unknown condition: {}", e.0),
            Self::Completion(e) => e.kind().user_message().to_string(),
        }
    }
}
