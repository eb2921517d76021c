//! HTTP request handlers

use super::types::{ErrorResponse, LogQueryParams, LogsResponse};
use super::AppState;
use crate::line::{verify_signature, WebhookPayload, SIGNATURE_HEADER};
use crate::logstore::LogFilter;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // LINE webhook entrypoint
        .route("/callback", post(callback))
        // Admin log query
        .route("/admin/logs", get(admin_logs))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook Callback
// ============================================================

/// Verify, parse and dispatch one webhook delivery. LINE retries on
/// non-2xx, so dispatch and reply failures are logged but still answered
/// with 200; only signature and parse failures are rejected.
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".to_string()))?;

    if !verify_signature(&state.channel_secret, &body, signature) {
        tracing::warn!("webhook signature verification failed");
        return Err(AppError::BadRequest("Invalid signature".to_string()));
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    for event in &payload.events {
        let Some((user_id, text, reply_token)) = event.as_text_message() else {
            tracing::debug!(event_type = %event.event_type, "ignoring non-text event");
            continue;
        };

        let reply = state.dispatcher.handle_text(user_id, text).await;
        if let Err(e) = state.line.reply(reply_token, &reply).await {
            tracing::error!(user_id = %user_id, error = %e, "failed to send reply");
        }
    }

    Ok("OK")
}

// ============================================================
// Admin Log Query
// ============================================================

async fn admin_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
    headers: HeaderMap,
) -> Result<Json<LogsResponse>, AppError> {
    let Some(expected) = &state.admin_token else {
        return Err(AppError::Unauthorized("Admin token not configured".to_string()));
    };

    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if !authorized {
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    let filter = LogFilter {
        from_timestamp: params.from,
        to_timestamp: params.to,
        user_id: params.user_id,
        limit: params.limit,
    };

    let logs = state
        .logs
        .query_logs(&filter)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(LogsResponse { logs }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("line-relay ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
