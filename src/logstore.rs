//! Append-only chat log store
//!
//! Backs the admin log endpoint. One row per successfully relayed exchange:
//! the active system prompt, the user's text, and the model's reply.

use chrono::Utc;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Log database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type LogResult<T> = Result<T, LogError>;

/// SQL schema for initialization
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS chat_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    user_id TEXT NOT NULL,
    prompt TEXT NOT NULL,
    input_text TEXT NOT NULL,
    output_text TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_logs_timestamp ON chat_logs(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_chat_logs_user ON chat_logs(user_id, timestamp DESC);
";

/// One relayed exchange
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub user_id: String,
    pub prompt: String,
    pub input_text: String,
    pub output_text: String,
}

impl LogEntry {
    pub fn now(
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        input_text: impl Into<String>,
        output_text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            input_text: input_text.into(),
            output_text: output_text.into(),
        }
    }

}

/// Query filter for the admin endpoint
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub from_timestamp: Option<i64>,
    pub to_timestamp: Option<i64>,
    pub user_id: Option<String>,
    pub limit: Option<u32>,
}

const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Thread-safe log store handle
#[derive(Clone)]
pub struct ChatLogStore {
    conn: Arc<Mutex<Connection>>,
}

impl ChatLogStore {
    /// Open or create the log database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> LogResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory log database (for testing)
    pub fn open_in_memory() -> LogResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> LogResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append one exchange to the log
    pub fn write_log(&self, entry: &LogEntry) -> LogResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_logs (timestamp, user_id, prompt, input_text, output_text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                entry.timestamp,
                entry.user_id,
                entry.prompt,
                entry.input_text,
                entry.output_text
            ],
        )?;
        Ok(())
    }

    /// Query logged exchanges, newest first
    pub fn query_logs(&self, filter: &LogFilter) -> LogResult<Vec<LogEntry>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(from) = filter.from_timestamp {
            conditions.push("timestamp >= ?");
            values.push(from.into());
        }
        if let Some(to) = filter.to_timestamp {
            conditions.push("timestamp <= ?");
            values.push(to.into());
        }
        if let Some(user_id) = &filter.user_id {
            conditions.push("user_id = ?");
            values.push(user_id.clone().into());
        }

        let mut sql = String::from(
            "SELECT timestamp, user_id, prompt, input_text, output_text FROM chat_logs",
        );
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
        values.push(i64::from(filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT)).into());

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(LogEntry {
                timestamp: row.get(0)?,
                user_id: row.get(1)?,
                prompt: row.get(2)?,
                input_text: row.get(3)?,
                output_text: row.get(4)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(LogError::from)
    }
}
