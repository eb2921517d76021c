//! API response types

use crate::logstore::LogEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

/// Query parameters for the admin log endpoint
#[derive(Debug, Deserialize, Default)]
pub struct LogQueryParams {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub user_id: Option<String>,
    pub limit: Option<u32>,
}
