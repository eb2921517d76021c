//! Chat completion error types

use thiserror::Error;

/// Chat completion error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Auth, message)
    }

    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Overloaded, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transient, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Other, message)
    }
}

/// Error classification, decided at the HTTP boundary where the raw provider
/// error is parsed. Downstream code matches on the kind, never on message
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// Bad or missing credential (401, 403) - not retryable
    Auth,
    /// Rate limited or out of capacity (429) - retryable with backoff
    Overloaded,
    /// Network failure, timeout, unparseable response, server error (5xx) -
    /// the user sees a generic retry message
    Transient,
    /// Anything else - provider message is surfaced for operator diagnosis
    Other,
}

impl ChatErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Overloaded | Self::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Overloaded => "overloaded",
            Self::Transient => "transient",
            Self::Other => "other",
        }
    }
}
