//! LINE messaging platform boundary
//!
//! Webhook payload types, `X-Line-Signature` verification, and the reply
//! client. Thin transport wrappers with no conversation logic.

mod client;
mod signature;
mod types;

pub use client::{LineClient, LineError};
pub use signature::verify_signature;
pub use types::{EventMessage, EventSource, WebhookEvent, WebhookPayload};

/// Header carrying the webhook body signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";
