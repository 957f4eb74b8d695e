//! Events that can occur in a session

use super::state::RequestTag;
use crate::llm::CompletionError;
use crate::persona::Persona;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    SelectPersona {
        persona: Persona,
        at: DateTime<Utc>,
    },
    UserMessage {
        text: String,
        at: DateTime<Utc>,
    },
    Cancel,

    // Completion events
    CompletionSucceeded {
        tag: RequestTag,
        text: String,
        at: DateTime<Utc>,
    },
    CompletionFailed {
        tag: RequestTag,
        error: CompletionError,
    },
}
