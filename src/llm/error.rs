//! Completion error types

use std::time::Duration;
use thiserror::Error;

/// Failure of a single completion call.
///
/// Every variant is recoverable from the session's point of view: the
/// conversation stays usable and the user may resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// Connection refused, DNS failure, reset mid-body
    #[error("transport failure: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP {code}: {message}")]
    HttpStatus { code: u16, message: String },

    /// The endpoint answered 2xx but the reply text could not be located
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No complete answer within the configured bound
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl CompletionError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn http_status(code: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn kind(&self) -> CompletionErrorKind {
        match self {
            Self::Transport(_) => CompletionErrorKind::Network,
            Self::HttpStatus { .. } => CompletionErrorKind::HttpStatus,
            Self::Malformed(_) => CompletionErrorKind::MalformedResponse,
            Self::Timeout(_) => CompletionErrorKind::Timeout,
        }
    }
}

/// Error classification for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    Network,
    HttpStatus,
    MalformedResponse,
    Timeout,
}

impl CompletionErrorKind {
    /// Stable machine-readable category
    pub fn category(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::MalformedResponse => "malformed_response",
            Self::Timeout => "timeout",
        }
    }

    /// Message shown to the person chatting. Each kind needs a different
    /// remedy, so they are never collapsed into one generic string.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Network => {
                "A network error occurred while contacting the model. Please try again."
            }
            Self::HttpStatus => {
                "The model service rejected the request. Please try again; if it keeps happening, report it."
            }
            Self::MalformedResponse => {
                "The model service returned a response in an unexpected format. Please report this."
            }
            Self::Timeout => "The model took too long to answer. Please try again.",
        }
    }
}
