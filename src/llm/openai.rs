//! OpenAI chat completions provider implementation

use super::types::Message;
use super::{ChatClient, ChatError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// OpenAI-compatible chat completions client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Validate the credential against the models endpoint. Used at startup
    /// so a bad key is visible in the logs before the first user message.
    pub async fn check_token(&self) -> Result<(), ChatError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::transient(format!("Failed to read response: {e}")))?;
        Err(classify_status_error(status, &body))
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[Message],
        model_engine: &str,
    ) -> Result<Message, ChatError> {
        let request = CompletionRequest {
            model: model_engine,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::transient(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status_error(status, &body));
        }

        let completion: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::transient(format!("Failed to parse response: {e}")))?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %model_engine,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ChatError::transient("Response contained no choices"))
    }
}

fn classify_transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::transient(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ChatError::transient(format!("Connection failed: {e}"))
    } else {
        ChatError::other(format!("Request failed: {e}"))
    }
}

fn classify_status_error(status: reqwest::StatusCode, body: &str) -> ChatError {
    // Prefer the structured provider message over the raw body.
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        401 | 403 => ChatError::auth(message),
        429 => ChatError::overloaded(message),
        500..=599 => ChatError::transient(format!("Server error ({status}): {message}")),
        _ => ChatError::other(format!("HTTP {status}: {message}")),
    }
}

// OpenAI API wire types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
