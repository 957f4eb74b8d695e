//! Completion client abstraction
//!
//! Provides a provider-agnostic interface for turning a [`GenerationRequest`]
//! into the model's reply text.

mod error;
mod gemini;
mod types;

pub use error::{CompletionError, CompletionErrorKind};
pub use gemini::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::{GenerationRequest, Turn, TurnRole};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion endpoints
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return the first candidate's text.
    ///
    /// Implementations perform exactly one call; retries belong to the caller.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, CompletionError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion clients
pub struct LoggingClient {
    inner: Arc<dyn CompletionClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn CompletionClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionClient for LoggingClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    turns = request.turns().len(),
                    user_turns = request
                        .turns()
                        .iter()
                        .filter(|t| t.role == TurnRole::User)
                        .count(),
                    prompt_chars = request.latest_user_text().map_or(0, |t| t.chars().count()),
                    has_system_instruction = request.system_instruction().is_some(),
                    reply_chars = reply.chars().count(),
                    "Completion request succeeded"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    category = e.kind().category(),
                    error = %e,
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
