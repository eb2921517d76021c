//! Process configuration
//!
//! All settings come from the environment at startup and are immutable
//! afterwards.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_db_path: String,
    /// LINE channel secret, used to verify webhook signatures
    pub channel_secret: String,
    /// LINE channel access token, used to send replies
    pub channel_access_token: String,
    pub openai_api_key: String,
    pub model_engine: String,
    /// Process-wide default system message; users can override per-user
    pub system_message: String,
    /// Number of user+assistant turn pairs retained per user
    pub memory_message_count: usize,
    /// Command token that routes to the system-message override
    pub system_command: String,
    /// Bearer token for the admin log endpoint; unset disables the endpoint
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_var("RELAY_PORT", 8000)?,
            log_db_path: std::env::var("RELAY_DB_PATH").unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                format!("{home}/.line-relay/logs.db")
            }),
            channel_secret: require_var("LINE_CHANNEL_SECRET")?,
            channel_access_token: require_var("LINE_CHANNEL_ACCESS_TOKEN")?,
            openai_api_key: require_var("OPENAI_API_KEY")?,
            model_engine: std::env::var("OPENAI_MODEL_ENGINE")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            system_message: std::env::var("SYSTEM_MESSAGE")
                .unwrap_or_else(|_| "You are a helpful assistant.".to_string()),
            memory_message_count: parse_var("MEMORY_MESSAGE_COUNT", 2)?,
            system_command: std::env::var("RELAY_SYSTEM_COMMAND")
                .unwrap_or_else(|_| "/system".to_string()),
            admin_token: std::env::var("RELAY_ADMIN_TOKEN").ok(),
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            value,
        }),
        Err(_) => Ok(default),
    }
}
