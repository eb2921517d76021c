//! Webhook payload types
//!
//! Only the fields this service reads are modeled; LINE sends many more,
//! which serde ignores.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
}

impl WebhookEvent {
    /// The (user id, text, reply token) triple of a text-message event, if
    /// that is what this event is.
    pub fn as_text_message(&self) -> Option<(&str, &str, &str)> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.message_type != "text" {
            return None;
        }
        let text = message.text.as_deref()?;
        let user_id = self.source.as_ref()?.user_id.as_deref()?;
        let reply_token = self.reply_token.as_deref()?;
        Some((user_id, text, reply_token))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<String>,
}
