//! Per-turn request construction
//!
//! `build` is called against the log as it stands *before* the new user
//! message is appended. An assistant tail (the opener on the first turn, or
//! the latest reply) is dropped from the replay. A user tail, left behind by
//! a failed or cancelled turn, is kept so its text still reaches the model.
//! The new input follows as a single user turn and appears exactly once.

use super::state::{ConversationState, InvalidState, Message, Phase, Role};
use crate::llm::{GenerationRequest, Turn};

pub fn build(
    state: &ConversationState,
    new_user_text: &str,
) -> Result<GenerationRequest, InvalidState> {
    let phase = state.phase();
    let Some(persona) = state.persona().filter(|_| phase == Phase::Active) else {
        return Err(InvalidState::NotActive(phase));
    };

    if new_user_text.trim().is_empty() {
        return Err(InvalidState::EmptyInput);
    }

    let mut turns: Vec<Turn> = state.messages().iter().map(to_turn).collect();
    if state.messages().last().map(Message::role) == Some(Role::Assistant) {
        turns.pop();
    }
    turns.push(Turn::user(new_user_text));

    Ok(GenerationRequest::new(turns, Some(persona.system_instruction.clone())))
}

fn to_turn(message: &Message) -> Turn {
    match message.role() {
        Role::User => Turn::user(message.text()),
        Role::Assistant => Turn::model(message.text()),
    }
}
