//! HTTP request handlers

use super::types::{
    CancelResponse, ErrorResponse, MessageRequest, MessageResponse, PersonasResponse,
    SelectPersonaRequest, SessionResponse,
};
use super::AppState;
use crate::llm::CompletionErrorKind;
use crate::session::{SessionError, TurnOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session view
        .route("/api/session", get(get_session))
        .route("/api/personas", get(list_personas))
        // User actions
        .route("/api/session/persona", post(select_persona))
        .route("/api/session/messages", post(send_message))
        .route("/api/session/cancel", post(cancel_turn))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session view
// ============================================================

async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let info = state.session.catalog_info();
    Json(SessionResponse {
        title: info.title.clone(),
        subtitle: info.subtitle.clone(),
        session: state.session.snapshot().await,
    })
}

async fn list_personas(State(state): State<AppState>) -> Json<PersonasResponse> {
    let info = state.session.catalog_info();
    Json(PersonasResponse {
        personas: state.session.personas(),
        allow_switching: info.allow_switching,
        default_persona: info.default_persona.clone(),
    })
}

// ============================================================
// User actions
// ============================================================

async fn select_persona(
    State(state): State<AppState>,
    Json(req): Json<SelectPersonaRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.session.select_persona(&req.persona_id).await?;
    let info = state.session.catalog_info();
    Ok(Json(SessionResponse {
        title: info.title.clone(),
        subtitle: info.subtitle.clone(),
        session,
    }))
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = state.session.submit_user_message(&req.text).await?;
    let session = state.session.snapshot().await;

    let response = match outcome {
        TurnOutcome::Replied { reply, closed } => MessageResponse {
            outcome: "replied",
            reply: Some(reply),
            closed,
            session,
        },
        TurnOutcome::Discarded => MessageResponse {
            outcome: "discarded",
            reply: None,
            closed: session.closed,
            session,
        },
    };
    Ok(Json(response))
}

async fn cancel_turn(State(state): State<AppState>) -> Json<CancelResponse> {
    let cancelled = state.session.cancel().await;
    Json(CancelResponse {
        ok: true,
        cancelled,
    })
}

async fn get_version() -> &'static str {
    concat!("persona-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

struct AppError(SessionError);

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::InputRejected(_) => StatusCode::CONFLICT,
            SessionError::InvalidState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Completion(e) => match e.kind() {
                CompletionErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                CompletionErrorKind::Network
                | CompletionErrorKind::HttpStatus
                | CompletionErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
            },
        };

        let body = Json(ErrorResponse {
            error: self.0.user_message(),
            category: self.0.category(),
            recoverable: self.0.is_recoverable(),
            detail: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
