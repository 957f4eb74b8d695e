//! Conversation state types

use crate::persona::Persona;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    #[allow(dead_code)] // Exposed through serialization
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Externally visible session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No persona chosen; input disabled
    Unselected,
    /// Persona chosen; accepting input
    Active,
    /// Termination marker received; input disabled until a persona is selected
    Closed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Unselected => "unselected",
            Phase::Active => "active",
            Phase::Closed => "closed",
        }
    }
}

/// Identifies one in-flight completion request.
///
/// `generation` changes on every persona selection, `turn` on every user
/// submission within a generation. A reply is only applied when its tag still
/// matches the pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestTag {
    pub generation: u64,
    pub turn: u64,
}

/// Immutable per-session configuration
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Exact, case-sensitive substring that closes the conversation
    pub termination_marker: String,
    /// Seeded as the first assistant message when a persona has no opener
    pub default_greeting: String,
}

pub const DEFAULT_TERMINATION_MARKER: &str = "[END_OF_CONVERSATION]";
pub const DEFAULT_GREETING: &str = "Hello! What can I help you with?";

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            termination_marker: DEFAULT_TERMINATION_MARKER.to_string(),
            default_greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

/// The one mutable entity of a session.
///
/// Only the transition function produces new values; everything else reads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationState {
    generation: u64,
    persona: Option<Persona>,
    messages: Vec<Message>,
    closed: bool,
    next_turn: u64,
    pending: Option<RequestTag>,
}

impl ConversationState {
    /// Nothing selected yet
    pub fn unselected(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Fresh state for `persona`, seeded with its opener (or the greeting).
    ///
    /// A persona without a system instruction is the "nothing selected"
    /// placeholder and yields an unselected state.
    pub fn started(
        persona: &Persona,
        context: &SessionContext,
        generation: u64,
        at: DateTime<Utc>,
    ) -> Self {
        if !persona.enables_input() {
            return Self::unselected(generation);
        }

        let opener = persona
            .opening_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&context.default_greeting);

        Self {
            generation,
            persona: Some(persona.clone()),
            messages: vec![Message::assistant(opener, at)],
            closed: false,
            next_turn: 0,
            pending: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match (&self.persona, self.closed) {
            (None, _) => Phase::Unselected,
            (Some(_), false) => Phase::Active,
            (Some(_), true) => Phase::Closed,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    pub fn persona_id(&self) -> Option<&str> {
        self.persona.as_ref().map(|p| p.id.as_str())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending(&self) -> Option<RequestTag> {
        self.pending
    }

    pub fn awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }

    // Mutators are restricted to the session module; the transition function
    // is their only caller.

    pub(super) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(super) fn close(&mut self) {
        self.closed = true;
    }

    pub(super) fn begin_turn(&mut self) -> RequestTag {
        let tag = RequestTag {
            generation: self.generation,
            turn: self.next_turn,
        };
        self.next_turn += 1;
        self.pending = Some(tag);
        tag
    }

    pub(super) fn finish_turn(&mut self) {
        self.pending = None;
    }
}

/// The session was asked to do something its current state cannot support.
///
/// Correct callers never see this; it signals a bug rather than a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidState {
    #[error("cannot build a request while the session is {}", .0.as_str())]
    NotActive(Phase),
    #[error("user input is empty")]
    EmptyInput,
    #[error("completion for request {0:?} arrived but no such request is pending")]
    UnexpectedCompletion(RequestTag),
    #[error("user message accepted but no completion request was produced")]
    MissingRequest,
}

/// Why a submission or switch was refused. A no-op for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("no persona is selected")]
    NoPersonaSelected,
    #[error("the conversation has ended")]
    Closed,
    #[error("a reply to the previous message is still pending")]
    AwaitingReply,
    #[error("switching personas is disabled for this deployment")]
    SwitchingDisabled,
}
