//! Per-user conversation memory
//!
//! Owns each user's message history and system-message override, and applies
//! the retention policy after every append. The outer map lock is only held
//! for lookup/insert; a per-user mutex serializes mutation of one user's
//! history, so concurrent requests from different users never block each
//! other.

pub mod policy;

#[cfg(test)]
mod proptests;

use crate::llm::{Message, Role};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Default)]
struct ConversationState {
    history: Vec<Message>,
    system_override: Option<String>,
}

/// Store of per-user conversation state.
///
/// Histories are process-local and live for the process lifetime; this is a
/// known scaling limit, not something the store tries to hide.
pub struct ConversationStore {
    entries: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
    default_system_message: String,
    memory_message_count: usize,
}

impl ConversationStore {
    pub fn new(default_system_message: String, memory_message_count: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_system_message,
            memory_message_count,
        }
    }

    /// Append a message to `user_id`'s history, materializing it with the
    /// active system message first if it is empty, then apply the retention
    /// policy.
    pub fn append(&self, user_id: &str, role: Role, content: impl Into<String>) {
        let entry = self.entry(user_id);
        let mut state = entry.lock().unwrap();

        if state.history.is_empty() {
            let system = state
                .system_override
                .clone()
                .unwrap_or_else(|| self.default_system_message.clone());
            state.history.push(Message::system(system));
        }

        state.history.push(Message::new(role, content));
        policy::trim(&mut state.history, self.memory_message_count);

        debug_assert_eq!(
            state.history.first().map(|m| m.role),
            Some(Role::System),
            "history must start with the system message after append"
        );
    }

    /// Current history for `user_id`, system message first. Empty until the
    /// first `append` materializes the conversation.
    pub fn get(&self, user_id: &str) -> Vec<Message> {
        let entries = self.entries.read().unwrap();
        match entries.get(user_id) {
            Some(entry) => entry.lock().unwrap().history.clone(),
            None => Vec::new(),
        }
    }

    /// Set `user_id`'s system-message override and clear their history. The
    /// next `append` reinitializes the history with the new override. Other
    /// users are unaffected.
    pub fn change_system_message(&self, user_id: &str, text: impl Into<String>) {
        let entry = self.entry(user_id);
        let mut state = entry.lock().unwrap();
        state.system_override = Some(text.into());
        state.history.clear();
    }

    /// Clear `user_id`'s history. Any override stays in place.
    pub fn remove(&self, user_id: &str) {
        let entries = self.entries.read().unwrap();
        if let Some(entry) = entries.get(user_id) {
            entry.lock().unwrap().history.clear();
        }
    }

    /// The system message currently steering `user_id`'s conversation.
    pub fn active_system_message(&self, user_id: &str) -> String {
        let entries = self.entries.read().unwrap();
        entries
            .get(user_id)
            .and_then(|entry| entry.lock().unwrap().system_override.clone())
            .unwrap_or_else(|| self.default_system_message.clone())
    }

    fn entry(&self, user_id: &str) -> Arc<Mutex<ConversationState>> {
        {
            let entries = self.entries.read().unwrap();
            if let Some(entry) = entries.get(user_id) {
                return entry.clone();
            }
        }
        let mut entries = self.entries.write().unwrap();
        entries.entry(user_id.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: usize) -> ConversationStore {
        ConversationStore::new("default system".to_string(), pairs)
    }

    #[test]
    fn first_append_injects_system_message() {
        let store = store(2);
        store.append("u1", Role::User, "hi");
        let history = store.get("u1");
        assert_eq!(
            history,
            vec![Message::system("default system"), Message::user("hi")]
        );
    }

    #[test]
    fn get_before_first_append_is_empty() {
        let store = store(2);
        assert!(store.get("nobody").is_empty());
    }

    #[test]
    fn history_always_starts_with_system_message() {
        let store = store(1);
        for i in 0..20 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append("u1", role, format!("m{i}"));
            assert_eq!(store.get("u1")[0].role, Role::System);
        }
    }

    #[test]
    fn change_system_message_resets_history() {
        let store = store(2);
        store.append("u1", Role::User, "hi");
        store.change_system_message("u1", "X");

        assert!(store.get("u1").is_empty());

        store.append("u1", Role::User, "hi");
        assert_eq!(
            store.get("u1"),
            vec![Message::system("X"), Message::user("hi")]
        );
    }

    #[test]
    fn override_survives_remove() {
        let store = store(2);
        store.change_system_message("u1", "custom");
        store.append("u1", Role::User, "a");
        store.remove("u1");

        assert!(store.get("u1").is_empty());
        store.append("u1", Role::User, "b");
        assert_eq!(store.get("u1")[0], Message::system("custom"));
    }

    #[test]
    fn users_are_isolated() {
        let store = store(2);
        store.append("a", Role::User, "from a");
        store.change_system_message("b", "b's prompt");
        store.append("b", Role::User, "from b");
        store.remove("b");

        assert_eq!(
            store.get("a"),
            vec![Message::system("default system"), Message::user("from a")]
        );
    }

    #[test]
    fn empty_content_is_stored_as_is() {
        let store = store(2);
        store.append("u1", Role::User, "");
        assert_eq!(store.get("u1")[1], Message::user(""));
    }

    // Interleaved turns with pairs=2: the trim fires when the history
    // (including the system message) reaches 7 entries, cutting back to 5,
    // so the seventh appended turn lands on a 6-entry history.
    #[test]
    fn interleaved_turns_trim_to_recent_pairs() {
        let store = store(2);
        for (role, content) in [
            (Role::User, "a1"),
            (Role::Assistant, "b1"),
            (Role::User, "a2"),
            (Role::Assistant, "b2"),
            (Role::User, "a3"),
            (Role::Assistant, "b3"),
            (Role::User, "a4"),
        ] {
            store.append("u1", role, content);
        }

        let history = store.get("u1");
        assert_eq!(
            history,
            vec![
                Message::system("default system"),
                Message::user("a2"),
                Message::assistant("b2"),
                Message::user("a3"),
                Message::assistant("b3"),
                Message::user("a4"),
            ]
        );
    }

    #[test]
    fn appending_past_the_threshold_stays_in_the_hysteresis_band() {
        let pairs = 3;
        let store = store(pairs);
        // 2*pairs + 3 appends: the trim fires once along the way and the
        // final append lands after it.
        for i in 0..(2 * pairs + 3) {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append("u1", role, format!("m{i}"));
        }
        let history = store.get("u1");
        assert_eq!(history.len(), 2 * pairs + 2);
        assert_eq!(history[0].role, Role::System);
        // Remaining turns are a contiguous suffix of the appended sequence.
        let contents: Vec<&str> = history[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m2", "m3", "m4", "m5", "m6", "m7", "m8"]);
    }

    #[test]
    fn active_system_message_reflects_override() {
        let store = store(2);
        assert_eq!(store.active_system_message("u1"), "default system");
        store.change_system_message("u1", "custom");
        assert_eq!(store.active_system_message("u1"), "custom");
        assert_eq!(store.active_system_message("u2"), "default system");
    }
}
