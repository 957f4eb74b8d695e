//! Session controller
//!
//! Owns the live [`ConversationState`], feeds events through the pure
//! transition function and executes the resulting effects. The state lock is
//! never held across the remote call or the latency delay.

use super::state::{ConversationState, InvalidState, Message, Phase, RejectReason, RequestTag};
use super::{
    transition, Effect, Event, LatencyPolicy, SessionContext, SessionError, TransitionError,
};
use crate::llm::{CompletionClient, CompletionError, GenerationRequest};
use crate::persona::{CatalogInfo, PersonaRegistry, PersonaSummary};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Result of a submission that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied { reply: String, closed: bool },
    /// Cancelled, or overtaken by a persona switch; the session was not touched
    Discarded,
}

/// Read-only view of the session for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub persona_id: Option<String>,
    pub persona_label: Option<String>,
    pub generation: u64,
    pub messages: Vec<Message>,
    pub closed: bool,
    pub awaiting_reply: bool,
}

impl SessionSnapshot {
    fn of(state: &ConversationState) -> Self {
        Self {
            phase: state.phase(),
            persona_id: state.persona_id().map(str::to_string),
            persona_label: state.persona().map(|p| p.label.clone()),
            generation: state.generation(),
            messages: state.messages().to_vec(),
            closed: state.is_closed(),
            awaiting_reply: state.awaiting_reply(),
        }
    }
}

struct Inner {
    state: ConversationState,
    /// Token for the request currently at the completion client
    in_flight: Option<(RequestTag, CancellationToken)>,
}

/// Single-session controller
pub struct SessionController<C>
where
    C: CompletionClient,
{
    registry: Arc<PersonaRegistry>,
    context: SessionContext,
    client: C,
    latency: LatencyPolicy,
    inner: Mutex<Inner>,
}

impl<C> SessionController<C>
where
    C: CompletionClient,
{
    /// Starts on the catalog's default persona when it names one, otherwise
    /// unselected.
    pub fn new(
        registry: Arc<PersonaRegistry>,
        context: SessionContext,
        client: C,
        latency: LatencyPolicy,
    ) -> Self {
        let state = match registry.default_persona() {
            Some(persona) => ConversationState::started(persona, &context, 0, Utc::now()),
            None => ConversationState::unselected(0),
        };

        Self {
            registry,
            context,
            client,
            latency,
            inner: Mutex::new(Inner {
                state,
                in_flight: None,
            }),
        }
    }

    pub fn personas(&self) -> Vec<PersonaSummary> {
        self.registry.list()
    }

    pub fn catalog_info(&self) -> &CatalogInfo {
        self.registry.info()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::of(&self.inner.lock().await.state)
    }

    /// Replace the session with a fresh one for `persona_id`.
    ///
    /// Any in-flight completion is aborted; its reply can never reach the new
    /// state.
    pub async fn select_persona(&self, persona_id: &str) -> Result<SessionSnapshot, SessionError> {
        let persona = self.registry.get(persona_id)?.clone();

        let info = self.registry.info();
        if !info.allow_switching && info.default_persona.as_deref() != Some(persona_id) {
            tracing::info!(persona = %persona_id, "Persona switch refused; switching disabled");
            return Err(SessionError::InputRejected(RejectReason::SwitchingDisabled));
        }

        let mut inner = self.inner.lock().await;
        let effects = self.apply(
            &mut inner,
            Event::SelectPersona {
                persona,
                at: Utc::now(),
            },
        )?;
        Self::execute_effects(&mut inner, effects);

        tracing::info!(
            persona = %persona_id,
            generation = inner.state.generation(),
            phase = inner.state.phase().as_str(),
            "Persona selected"
        );

        Ok(SessionSnapshot::of(&inner.state))
    }

    /// Run one user turn to completion.
    pub async fn submit_user_message(&self, text: &str) -> Result<TurnOutcome, SessionError> {
        let (request, tag, token) = {
            let mut inner = self.inner.lock().await;
            let event = Event::UserMessage {
                text: text.to_string(),
                at: Utc::now(),
            };
            let effects = match self.apply(&mut inner, event) {
                Ok(effects) => effects,
                Err(e) => {
                    let e = SessionError::from(e);
                    log_rejection(&e, inner.state.generation());
                    return Err(e);
                }
            };

            let Some((request, tag)) = Self::execute_effects(&mut inner, effects) else {
                tracing::error!("User message accepted without a completion request");
                return Err(InvalidState::MissingRequest.into());
            };

            let token = CancellationToken::new();
            inner.in_flight = Some((tag, token.clone()));
            (request, tag, token)
        };

        let turn_id = Uuid::new_v4();
        tracing::debug!(
            %turn_id,
            generation = tag.generation,
            turn = tag.turn,
            turns = request.turns().len(),
            "Requesting completion"
        );

        let result = tokio::select! {
            () = token.cancelled() => None,
            result = self.complete_paced(&request) => Some(result),
        };

        let Some(result) = result else {
            tracing::info!(%turn_id, "Completion abandoned");
            return Ok(TurnOutcome::Discarded);
        };

        let mut inner = self.inner.lock().await;
        if inner.in_flight.as_ref().is_some_and(|(t, _)| *t == tag) {
            inner.in_flight = None;
        }

        let event = match &result {
            Ok(text) => Event::CompletionSucceeded {
                tag,
                text: text.clone(),
                at: Utc::now(),
            },
            Err(error) => Event::CompletionFailed {
                tag,
                error: error.clone(),
            },
        };

        match self.apply(&mut inner, event) {
            Ok(effects) => {
                Self::execute_effects(&mut inner, effects);
            }
            Err(TransitionError::Stale(stale)) => {
                tracing::info!(
                    %turn_id,
                    generation = stale.generation,
                    turn = stale.turn,
                    current_generation = inner.state.generation(),
                    "Discarding stale completion"
                );
                return Ok(TurnOutcome::Discarded);
            }
            Err(e) => return Err(e.into()),
        }

        match result {
            Ok(reply) => Ok(TurnOutcome::Replied {
                reply,
                closed: inner.state.is_closed(),
            }),
            Err(error) => Err(SessionError::Completion(error)),
        }
    }

    /// Abandon the pending completion, if any. Returns whether one was pending.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match self.apply(&mut inner, Event::Cancel) {
            Ok(effects) => {
                let cancelled = effects.contains(&Effect::AbortCompletion);
                Self::execute_effects(&mut inner, effects);
                cancelled
            }
            Err(e) => {
                tracing::error!(error = %e, "Cancel transition failed");
                false
            }
        }
    }

    fn apply(&self, inner: &mut Inner, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let result = transition(&inner.state, &self.context, event)?;
        inner.state = result.new_state;
        Ok(result.effects)
    }

    /// Execute effects that need the lock; hand back the completion request,
    /// which must run after the lock is released.
    fn execute_effects(
        inner: &mut Inner,
        effects: Vec<Effect>,
    ) -> Option<(GenerationRequest, RequestTag)> {
        let mut pending = None;
        for effect in effects {
            match effect {
                Effect::RequestCompletion { request, tag } => pending = Some((request, tag)),
                Effect::AbortCompletion => {
                    if let Some((tag, token)) = inner.in_flight.take() {
                        tracing::debug!(
                            generation = tag.generation,
                            turn = tag.turn,
                            "Aborting in-flight completion"
                        );
                        token.cancel();
                    }
                }
                Effect::NotifyClosed { persona_id } => {
                    tracing::info!(
                        persona = %persona_id,
                        generation = inner.state.generation(),
                        messages = inner.state.messages().len(),
                        "Termination marker received; conversation closed"
                    );
                }
                Effect::NotifyFailed { error } => {
                    tracing::warn!(
                        generation = inner.state.generation(),
                        category = error.kind().category(),
                        error = %error,
                        "Turn failed; session remains active"
                    );
                }
            }
        }
        pending
    }

    /// Completion call followed by the artificial reply delay
    async fn complete_paced(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        let result = self.client.complete(request).await;
        if result.is_ok() {
            let delay = self.latency.sample();
            if !delay.is_zero() {
                tracing::debug!(delay_ms = %delay.as_millis(), "Pacing reply");
                tokio::time::sleep(delay).await;
            }
        }
        result
    }
}

fn log_rejection(error: &SessionError, generation: u64) {
    match error {
        SessionError::InvalidState(e) => {
            tracing::error!(generation, error = %e, "Submission hit an invalid session state");
        }
        other => {
            tracing::info!(generation, error = %other, "Submission rejected");
        }
    }
}
