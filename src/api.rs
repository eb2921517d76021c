//! HTTP surface: the LINE webhook callback and the admin log endpoint

mod handlers;
mod types;

pub use handlers::create_router;

use crate::dispatch::Dispatcher;
use crate::line::LineClient;
use crate::logstore::ChatLogStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub line: Arc<LineClient>,
    pub logs: ChatLogStore,
    pub channel_secret: String,
    pub admin_token: Option<String>,
}
