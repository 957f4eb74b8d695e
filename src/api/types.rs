//! API request and response types

use crate::persona::PersonaSummary;
use crate::session::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Request to switch the active persona
#[derive(Debug, Deserialize)]
pub struct SelectPersonaRequest {
    pub persona_id: String,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Current session plus the page header
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub title: String,
    pub subtitle: String,
    pub session: SessionSnapshot,
}

/// Persona catalog for the selector
#[derive(Debug, Serialize)]
pub struct PersonasResponse {
    pub personas: Vec<PersonaSummary>,
    pub allow_switching: bool,
    pub default_persona: Option<String>,
}

/// Result of a submitted message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// `replied` or `discarded`
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub closed: bool,
    pub session: SessionSnapshot,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
    /// Whether a pending reply was actually abandoned
    pub cancelled: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Shown to the person chatting
    pub error: String,
    pub category: &'static str,
    /// Whether resubmitting can succeed
    pub recoverable: bool,
    pub detail: String,
}
