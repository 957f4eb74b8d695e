//! Google Gemini `generateContent` client

use super::types::GenerationRequest;
use super::{CompletionClient, CompletionError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Upper bound on how much of an unexpected body is copied into an error
const BODY_EXCERPT_CHARS: usize = 512;

/// Gemini client implementation
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint,
            model_id: model.to_string(),
            timeout,
        })
    }

    fn translate_request(request: &GenerationRequest) -> GeminiRequest<'_> {
        let contents = request
            .turns()
            .iter()
            .map(|turn| GeminiContent {
                role: turn.role.as_str(),
                parts: vec![GeminiPart { text: &turn.text }],
            })
            .collect();

        let system_instruction = request.system_instruction().map(|text| GeminiInstruction {
            parts: vec![GeminiPart { text }],
        });

        GeminiRequest {
            contents,
            system_instruction,
        }
    }

    /// Pull `candidates[0].content.parts[0].text` out of a success body.
    fn extract_reply(body: &str) -> Result<String, CompletionError> {
        let response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
            CompletionError::malformed(format!("invalid JSON ({e}); body: {}", excerpt(body)))
        })?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                CompletionError::malformed(format!(
                    "missing candidates[0].content.parts[0].text; body: {}",
                    excerpt(body)
                ))
            })
    }

    fn status_error(code: u16, body: &str) -> CompletionError {
        let message = serde_json::from_str::<GeminiErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| excerpt(body));
        CompletionError::http_status(code, message)
    }

    fn classify(&self, e: &reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else if e.is_connect() {
            CompletionError::transport(format!("connection failed: {e}"))
        } else {
            CompletionError::transport(format!("request failed: {e}"))
        }
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(&e))?;

        if !status.is_success() {
            return Err(Self::status_error(status.as_u16(), &body));
        }

        Self::extract_reply(&body)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn excerpt(body: &str) -> String {
    let mut out: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    if body.chars().count() > BODY_EXCERPT_CHARS {
        out.push('…');
    }
    out
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiInstruction<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
