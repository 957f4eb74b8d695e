//! Provider-agnostic request types

/// Speaker of a replayed turn, in the provider's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One role-tagged utterance in the replay history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Generation request built once per user turn.
///
/// Owns all of its data; nothing here points back into the session that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    turns: Vec<Turn>,
    system_instruction: Option<String>,
}

impl GenerationRequest {
    /// An empty or whitespace-only instruction is treated as absent.
    pub fn new(turns: Vec<Turn>, system_instruction: Option<String>) -> Self {
        Self {
            turns,
            system_instruction: system_instruction.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    /// Text of the final user turn
    pub fn latest_user_text(&self) -> Option<&str> {
        self.turns
            .last()
            .filter(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
    }
}
