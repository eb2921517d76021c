//! Reply client for the LINE messaging API

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.line.me";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LineError {
    #[error("LINE request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("LINE reply rejected ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Client for replying to webhook events
pub struct LineClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl LineClient {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a single text message in reply to a webhook event. Reply tokens
    /// are single-use and short-lived, so this is fire-once per event.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        let request = ReplyRequest {
            reply_token,
            messages: vec![ReplyMessage {
                message_type: "text",
                text,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v2/bot/message/reply", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(LineError::Rejected { status, body })
    }
}

// LINE API wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<ReplyMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyMessage<'a> {
    #[serde(rename = "type")]
    message_type: &'static str,
    text: &'a str,
}
