//! line-relay - webhook relay between LINE messaging and an OpenAI-style
//! chat completions API, with bounded per-user conversation memory and an
//! admin-queryable chat log.

mod api;
mod config;
mod dispatch;
mod line;
mod llm;
mod logstore;
mod memory;

use api::{create_router, AppState};
use config::Config;
use dispatch::Dispatcher;
use line::LineClient;
use llm::{ClientBindings, OpenAiClient};
use logstore::ChatLogStore;
use memory::ConversationStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "line_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;

    // Ensure log database directory exists
    if let Some(parent) = PathBuf::from(&config.log_db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.log_db_path, "Opening chat log database");
    let logs = ChatLogStore::open(&config.log_db_path)?;

    // Fail loud in the logs (but keep serving) if the default credential is
    // bad; per-user bindings are created from it on first contact.
    let startup_client = OpenAiClient::new(config.openai_api_key.clone());
    match startup_client.check_token().await {
        Ok(()) => tracing::info!(model = %config.model_engine, "OpenAI credential validated"),
        Err(e) => tracing::warn!(error = %e, "OpenAI credential check failed"),
    }

    let store = Arc::new(ConversationStore::new(
        config.system_message.clone(),
        config.memory_message_count,
    ));
    let bindings = Arc::new(ClientBindings::new(config.openai_api_key.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        store,
        bindings,
        logs.clone(),
        config.model_engine.clone(),
        config.system_command.clone(),
    ));

    if config.admin_token.is_none() {
        tracing::warn!("RELAY_ADMIN_TOKEN not set; /admin/logs will reject all requests");
    }

    let state = AppState {
        dispatcher,
        line: Arc::new(LineClient::new(config.channel_access_token.clone())),
        logs,
        channel_secret: config.channel_secret.clone(),
        admin_token: config.admin_token.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("line-relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
