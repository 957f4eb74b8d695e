//! Property-based tests for the session transition function
//!
//! Random scripts of user actions and completion outcomes are replayed
//! through [`transition`]; the message log must stay consistent throughout.

use super::request;
use super::state::*;
use super::transition::*;
use super::*;
use crate::llm::{CompletionError, Turn, TurnRole};
use crate::persona::Persona;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn personas() -> Vec<Persona> {
    vec![
        Persona {
            id: "baseline".to_string(),
            label: "Baseline".to_string(),
            system_instruction: "Be helpful.".to_string(),
            opening_message: Some("Hi! How can I help?".to_string()),
        },
        Persona {
            id: "terse".to_string(),
            label: "Terse".to_string(),
            system_instruction: "Be brief.".to_string(),
            opening_message: None,
        },
        Persona {
            id: "curious".to_string(),
            label: "Curious".to_string(),
            system_instruction: "Ask questions.".to_string(),
            opening_message: Some("Tell me about yourself!".to_string()),
        },
    ]
}

fn event_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn texts(state: &ConversationState) -> Vec<(Role, String)> {
    state
        .messages()
        .iter()
        .map(|m| (m.role(), m.text().to_string()))
        .collect()
}

fn select(persona: Persona) -> Event {
    Event::SelectPersona {
        persona,
        at: event_time(),
    }
}

fn user_says(text: &str) -> Event {
    Event::UserMessage {
        text: text.to_string(),
        at: event_time(),
    }
}

/// Insert `marker` into ASCII `text` at `offset`, clamped to the end
fn splice(text: &str, offset: usize, marker: &str) -> String {
    let mut out = text.to_string();
    out.insert_str(offset.min(text.len()), marker);
    out
}

fn to_turn(message: &Message) -> Turn {
    match message.role() {
        Role::User => Turn::user(message.text()),
        Role::Assistant => Turn::model(message.text()),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Select(usize),
    Submit(String),
    /// `marker` is the byte offset at which the termination marker is spliced in
    Succeed { text: String, marker: Option<usize> },
    Fail(CompletionError),
    Cancel,
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z?]{1,12}( [a-z0-9]{1,8}){0,3}"
}

fn arb_error() -> impl Strategy<Value = CompletionError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(CompletionError::Transport),
        (400u16..600, "[a-z ]{0,20}")
            .prop_map(|(code, msg)| CompletionError::http_status(code, msg)),
        "[a-z ]{1,20}".prop_map(CompletionError::Malformed),
        (1u64..120).prop_map(|s| CompletionError::Timeout(std::time::Duration::from_secs(s))),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => (0usize..3).prop_map(Step::Select),
        4 => arb_text().prop_map(Step::Submit),
        3 => (arb_text(), prop::option::weighted(0.1, 0usize..64))
            .prop_map(|(text, marker)| Step::Succeed { text, marker }),
        2 => arb_error().prop_map(Step::Fail),
        1 => Just(Step::Cancel),
    ]
}

// ============================================================================
// Script Runner
// ============================================================================

/// Tracks what the log should look like, independently of the state
#[derive(Debug, Default)]
struct Model {
    expected_len: usize,
    outstanding: Option<RequestTag>,
}

/// Replay `steps`, asserting invariants after every accepted event.
fn run_script(steps: &[Step]) -> Result<ConversationState, TestCaseError> {
    let ctx = SessionContext::default();
    let catalog = personas();
    let first = &catalog[0];
    let mut state = ConversationState::started(first, &ctx, 1, event_time());
    let mut model = Model {
        expected_len: 1,
        outstanding: None,
    };

    for step in steps {
        let event = match step.clone() {
            Step::Select(i) => Event::SelectPersona {
                persona: catalog[i].clone(),
                at: event_time(),
            },
            Step::Submit(text) => Event::UserMessage {
                text,
                at: event_time(),
            },
            Step::Succeed { text, marker } => {
                let Some(tag) = model.outstanding else { continue };
                let text = match marker {
                    Some(offset) => splice(&text, offset, &ctx.termination_marker),
                    None => text,
                };
                Event::CompletionSucceeded {
                    tag,
                    text,
                    at: event_time(),
                }
            }
            Step::Fail(error) => {
                let Some(tag) = model.outstanding else { continue };
                Event::CompletionFailed { tag, error }
            }
            Step::Cancel => Event::Cancel,
        };

        let was_closed = state.is_closed();
        let is_submit = matches!(event, Event::UserMessage { .. });
        let is_success = matches!(event, Event::CompletionSucceeded { .. });
        let is_select = matches!(event, Event::SelectPersona { .. });
        let reply_has_marker = matches!(
            &event,
            Event::CompletionSucceeded { text, .. } if text.contains(&ctx.termination_marker)
        );

        match transition(&state, &ctx, event) {
            Ok(result) => {
                state = result.new_state;
                if is_select {
                    model.expected_len = 1;
                    model.outstanding = None;
                } else if is_submit {
                    prop_assert!(!was_closed, "closed session accepted input");
                    model.expected_len += 1;
                    model.outstanding = state.pending();
                    prop_assert!(model.outstanding.is_some());
                } else if is_success {
                    model.expected_len += 1;
                    model.outstanding = None;
                    prop_assert_eq!(state.is_closed(), reply_has_marker);
                } else {
                    model.outstanding = None;
                }
            }
            Err(TransitionError::InputRejected(_)) => {
                prop_assert!(is_submit, "only submissions are rejected");
                prop_assert!(was_closed || state.awaiting_reply());
            }
            Err(e) => return Err(TestCaseError::fail(format!("unexpected error {e:?}"))),
        }

        prop_assert_eq!(state.messages().len(), model.expected_len);
        prop_assert_eq!(state.pending(), model.outstanding);
        prop_assert_eq!(state.messages()[0].role(), Role::Assistant);
        if state.awaiting_reply() {
            prop_assert_eq!(state.messages().last().map(Message::role), Some(Role::User));
        }
    }

    Ok(state)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Log length tracks accepted submissions and successful replies exactly
    #[test]
    fn prop_log_matches_model(steps in proptest::collection::vec(arb_step(), 0..40)) {
        run_script(&steps)?;
    }

    // Selecting the same persona twice in a row yields the same log
    #[test]
    fn prop_select_is_idempotent_in_content(
        steps in proptest::collection::vec(arb_step(), 0..20),
        idx in 0usize..3,
    ) {
        let state = run_script(&steps)?;
        let ctx = SessionContext::default();
        let persona = personas()[idx].clone();

        let once = transition(&state, &ctx, select(persona.clone())).unwrap().new_state;
        let twice = transition(&once, &ctx, select(persona)).unwrap().new_state;
        prop_assert_eq!(texts(&once), texts(&twice));
    }

    // A switch leaves exactly the new persona's opener, nothing from before
    #[test]
    fn prop_switch_never_leaks_history(
        steps in proptest::collection::vec(arb_step(), 0..30),
        idx in 0usize..3,
    ) {
        let state = run_script(&steps)?;
        let ctx = SessionContext::default();
        let persona = personas()[idx].clone();
        let expected = persona
            .opening_message
            .clone()
            .unwrap_or_else(|| ctx.default_greeting.clone());

        let result = transition(&state, &ctx, select(persona)).unwrap();
        prop_assert_eq!(texts(&result.new_state), vec![(Role::Assistant, expected)]);
        prop_assert!(!result.new_state.is_closed());
        prop_assert!(!result.new_state.awaiting_reply());
        prop_assert_eq!(
            result.effects.contains(&Effect::AbortCompletion),
            state.awaiting_reply()
        );
    }

    // The request replays the log minus an assistant tail, then the new input once
    #[test]
    fn prop_request_drops_assistant_tail_and_appends_input(
        steps in proptest::collection::vec(arb_step(), 0..30),
        input in arb_text(),
    ) {
        let state = run_script(&steps)?;
        prop_assume!(state.phase() == Phase::Active && !state.awaiting_reply());

        let built = request::build(&state, &input).unwrap();

        let mut expected: Vec<Turn> = state.messages().iter().map(to_turn).collect();
        if state.messages().last().map(Message::role) == Some(Role::Assistant) {
            expected.pop();
        }
        // Every user message in the log reaches the model
        let user_turns = state.messages().iter().filter(|m| m.role() == Role::User).count();
        prop_assert_eq!(
            built.turns().iter().filter(|t| t.role == TurnRole::User).count(),
            user_turns + 1
        );
        expected.push(Turn::user(input.clone()));
        prop_assert_eq!(built.turns(), expected.as_slice());
        prop_assert_eq!(built.latest_user_text(), Some(input.as_str()));
        prop_assert_eq!(
            built.system_instruction(),
            state.persona().map(|p| p.system_instruction.as_str())
        );
    }

    // After a marker reply, input stays rejected until a persona is reselected
    #[test]
    fn prop_closed_rejects_until_reselect(
        reply in arb_text(),
        offset in 0usize..32,
        attempts in proptest::collection::vec(arb_text(), 1..5),
    ) {
        let ctx = SessionContext::default();
        let persona = personas()[0].clone();
        let state = ConversationState::started(&persona, &ctx, 1, event_time());
        let sent = transition(&state, &ctx, user_says("bye")).unwrap();
        let tag = sent.new_state.pending().unwrap();
        let closed = transition(
            &sent.new_state,
            &ctx,
            Event::CompletionSucceeded {
                tag,
                text: splice(&reply, offset, &ctx.termination_marker),
                at: event_time(),
            },
        )
        .unwrap()
        .new_state;

        for text in attempts {
            let err = transition(&closed, &ctx, user_says(&text)).unwrap_err();
            prop_assert_eq!(err, TransitionError::InputRejected(RejectReason::Closed));
        }

        let reopened = transition(&closed, &ctx, select(persona)).unwrap().new_state;
        let accepted = transition(&reopened, &ctx, user_says("hello")).is_ok();
        prop_assert!(accepted, "reselected persona should accept input");
    }
}
