//! Effects produced by state transitions

use super::state::RequestTag;
use crate::llm::{CompletionError, GenerationRequest};

/// Effects to be executed by the controller after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the request to the completion endpoint
    RequestCompletion {
        request: GenerationRequest,
        tag: RequestTag,
    },

    /// Abandon the in-flight completion; its result must not be applied
    AbortCompletion,

    /// The termination marker was seen
    NotifyClosed { persona_id: String },

    /// The completion failed; the user message stays and the session stays active
    NotifyFailed { error: CompletionError },
}
