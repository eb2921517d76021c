//! Chat model provider abstraction
//!
//! Provides a common interface for sending a conversation to a chat
//! completion API and getting back a single assistant message.

mod bindings;
mod error;
mod openai;
mod types;

pub use bindings::ClientBindings;
pub use error::{ChatError, ChatErrorKind};
pub use openai::OpenAiClient;
pub use types::{Message, Role};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for chat completion providers
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the full message history and return the assistant's reply.
    /// Implementations must not mutate `messages`.
    async fn complete(&self, messages: &[Message], model_engine: &str)
        -> Result<Message, ChatError>;
}

/// Logging wrapper for chat clients
pub struct LoggingClient {
    inner: Arc<dyn ChatClient>,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn ChatClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ChatClient for LoggingClient {
    async fn complete(
        &self,
        messages: &[Message],
        model_engine: &str,
    ) -> Result<Message, ChatError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(messages, model_engine).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %model_engine,
                    duration_ms = %duration.as_millis(),
                    context_messages = messages.len(),
                    reply_chars = reply.content.len(),
                    "chat completion succeeded"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %model_engine,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    retryable = e.kind.is_retryable(),
                    error = %e.message,
                    "chat completion failed"
                );
            }
        }

        result
    }
}
