//! Mock completion clients for testing
//!
//! These mocks drive the controller without any network I/O.

use crate::llm::{CompletionClient, CompletionError, GenerationRequest};
use crate::persona::PersonaRegistry;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Completion Client
// ============================================================================

/// Returns queued results in order and records every request it sees
#[derive(Default)]
pub struct MockCompletionClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: CompletionError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::transport("No mock response queued")))
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        self.next(request)
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Gated Mock Client (for in-flight switching and cancellation)
// ============================================================================

/// Holds each request until [`GatedMockClient::release`] is called
#[derive(Default)]
pub struct GatedMockClient {
    inner: MockCompletionClient,
    /// Notified when a request reaches the client
    pub request_started: Notify,
    gate: Notify,
}

impl GatedMockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.inner.queue_reply(text);
    }

    /// Let one held request through
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl CompletionClient for GatedMockClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        self.request_started.notify_one();
        self.gate.notified().await;
        self.inner.next(request)
    }

    fn model_id(&self) -> &str {
        "gated-mock-model"
    }
}

// ============================================================================
// Catalog fixtures
// ============================================================================

pub const TEST_CATALOG: &str = r#"
title = "Test study"
allow_switching = true
default_persona = "none"

[[personas]]
id = "none"
label = "Select..."
system_instruction = ""

[[personas]]
id = "helper"
label = "Helper"
system_instruction = "You are a helpful assistant."
opening_message = "Hi! How can I help?"

[[personas]]
id = "skeptic"
label = "Skeptic"
system_instruction = "You doubt everything."

[[personas]]
id = "quiet"
label = "Quiet"
system_instruction = "Answer in one word."
opening_message = "..."
"#;

pub fn test_registry() -> Arc<PersonaRegistry> {
    Arc::new(PersonaRegistry::from_toml_str(TEST_CATALOG).unwrap())
}
