//! Per-user chat client bindings
//!
//! Each user gets a client handle on first contact, created with the
//! process-wide default credential and reused for the process lifetime.
//! `bind` swaps a user's client in place, which is how a per-user credential
//! would be installed without touching anyone else's binding.

use super::{ChatClient, LoggingClient, OpenAiClient};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct ClientBindings {
    clients: RwLock<HashMap<String, Arc<dyn ChatClient>>>,
    default_api_key: String,
}

impl ClientBindings {
    pub fn new(default_api_key: String) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            default_api_key,
        }
    }

    /// Get the client bound to `user_id`, creating one with the default
    /// credential on first contact.
    pub fn get_or_create(&self, user_id: &str) -> Arc<dyn ChatClient> {
        {
            let clients = self.clients.read().unwrap();
            if let Some(client) = clients.get(user_id) {
                return client.clone();
            }
        }

        let mut clients = self.clients.write().unwrap();
        // Another request may have created the binding between the locks.
        if let Some(client) = clients.get(user_id) {
            return client.clone();
        }

        tracing::debug!(user_id = %user_id, "creating chat client binding");
        let client: Arc<dyn ChatClient> = Arc::new(LoggingClient::new(Arc::new(
            OpenAiClient::new(self.default_api_key.clone()),
        )));
        clients.insert(user_id.to_string(), client.clone());
        client
    }

    /// Replace the client bound to `user_id`.
    pub fn bind(&self, user_id: &str, client: Arc<dyn ChatClient>) {
        let mut clients = self.clients.write().unwrap();
        clients.insert(user_id.to_string(), client);
    }
}
