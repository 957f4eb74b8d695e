//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result; no clock reads, no I/O. Timestamps arrive inside events.

use super::request;
use super::state::{ConversationState, InvalidState, Message, Phase, RejectReason, RequestTag};
use super::{Effect, Event, SessionContext};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("input rejected: {0}")]
    InputRejected(RejectReason),
    #[error(transparent)]
    InvalidState(#[from] InvalidState),
    /// A completion for a request that is no longer pending: built against a
    /// previous persona, or cancelled. Discard it.
    #[error("stale completion for {0:?}")]
    Stale(RequestTag),
}

pub fn transition(
    state: &ConversationState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Persona selection: always a fresh state, even for the same id
        // ============================================================
        Event::SelectPersona { persona, at } => {
            let fresh = ConversationState::started(&persona, context, state.generation() + 1, at);
            let result = TransitionResult::new(fresh);
            if state.awaiting_reply() {
                Ok(result.with_effect(Effect::AbortCompletion))
            } else {
                Ok(result)
            }
        }

        // ============================================================
        // User submission
        // ============================================================
        Event::UserMessage { text, at } => {
            match state.phase() {
                Phase::Unselected => {
                    return Err(TransitionError::InputRejected(RejectReason::NoPersonaSelected))
                }
                Phase::Closed => return Err(TransitionError::InputRejected(RejectReason::Closed)),
                Phase::Active if state.awaiting_reply() => {
                    return Err(TransitionError::InputRejected(RejectReason::AwaitingReply))
                }
                Phase::Active => {}
            }

            // Built against the log before the new message lands
            let request = request::build(state, &text)?;

            let mut next = state.clone();
            next.push_message(Message::user(text, at));
            let tag = next.begin_turn();

            Ok(TransitionResult::new(next).with_effect(Effect::RequestCompletion { request, tag }))
        }

        // ============================================================
        // Completion results
        // ============================================================
        Event::CompletionSucceeded { tag, text, at } => {
            ensure_pending(state, tag)?;

            let mut next = state.clone();
            next.finish_turn();
            let terminated = contains_marker(&text, &context.termination_marker);
            next.push_message(Message::assistant(text, at));

            if terminated {
                next.close();
                let persona_id = next.persona_id().unwrap_or_default().to_string();
                Ok(TransitionResult::new(next).with_effect(Effect::NotifyClosed { persona_id }))
            } else {
                Ok(TransitionResult::new(next))
            }
        }

        // User message stays visible, no assistant message, still Active
        Event::CompletionFailed { tag, error } => {
            ensure_pending(state, tag)?;

            let mut next = state.clone();
            next.finish_turn();
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyFailed { error }))
        }

        // ============================================================
        // Cancellation: idempotent
        // ============================================================
        Event::Cancel => {
            if state.awaiting_reply() {
                let mut next = state.clone();
                next.finish_turn();
                Ok(TransitionResult::new(next).with_effect(Effect::AbortCompletion))
            } else {
                Ok(TransitionResult::new(state.clone()))
            }
        }
    }
}

fn ensure_pending(state: &ConversationState, tag: RequestTag) -> Result<(), TransitionError> {
    if state.pending() == Some(tag) {
        Ok(())
    } else {
        Err(TransitionError::Stale(tag))
    }
}

/// Exact, case-sensitive substring match. An empty marker never matches.
pub fn contains_marker(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.contains(marker)
}
