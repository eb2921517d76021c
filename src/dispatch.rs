//! Inbound message dispatch
//!
//! Routes each inbound text to either the system-message command or the
//! model, and maps classified completion errors to fixed user-facing
//! fallback text. Every inbound message produces exactly one reply.
//!
//! The sequencing is append-then-call-then-append-on-success: a failed
//! completion leaves the user's turn in history but records no assistant
//! turn, so the model sees the unanswered message in context on retry.

use crate::llm::{ChatErrorKind, ClientBindings, Role};
use crate::logstore::{ChatLogStore, LogEntry};
use crate::memory::ConversationStore;
use std::sync::Arc;

const COMMAND_CONFIRMATION: &str = "System message updated.";
const AUTH_FALLBACK: &str = "The configured API token was rejected. Please contact the operator.";
const OVERLOADED_FALLBACK: &str = "The model is currently overloaded. Please try again later.";
const TRANSIENT_FALLBACK: &str =
    "Something went wrong talking to the model. Please try again in a moment.";
const OTHER_FALLBACK: &str =
    "The system hit an unexpected error. Please send a screenshot of this message to the operator.";

pub struct Dispatcher {
    store: Arc<ConversationStore>,
    bindings: Arc<ClientBindings>,
    logs: ChatLogStore,
    model_engine: String,
    system_command: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ConversationStore>,
        bindings: Arc<ClientBindings>,
        logs: ChatLogStore,
        model_engine: String,
        system_command: String,
    ) -> Self {
        Self {
            store,
            bindings,
            logs,
            model_engine,
            system_command,
        }
    }

    /// Handle one inbound text message and return the reply text.
    pub async fn handle_text(&self, user_id: &str, text: &str) -> String {
        let text = text.trim();
        tracing::info!(user_id = %user_id, chars = text.len(), "inbound message");

        if let Some(rest) = text.strip_prefix(self.system_command.as_str()) {
            let system_message = rest.trim();
            self.store.change_system_message(user_id, system_message);
            tracing::info!(user_id = %user_id, "system message changed");
            return COMMAND_CONFIRMATION.to_string();
        }

        self.store.append(user_id, Role::User, text);
        let client = self.bindings.get_or_create(user_id);
        let history = self.store.get(user_id);

        match client.complete(&history, &self.model_engine).await {
            Ok(reply) => {
                self.store.append(user_id, reply.role, reply.content.clone());
                self.record_exchange(user_id, text, &reply.content);
                reply.content
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "completion failed, replying with fallback"
                );
                match e.kind {
                    ChatErrorKind::Auth => AUTH_FALLBACK.to_string(),
                    ChatErrorKind::Overloaded => OVERLOADED_FALLBACK.to_string(),
                    ChatErrorKind::Transient => TRANSIENT_FALLBACK.to_string(),
                    ChatErrorKind::Other => format!("{OTHER_FALLBACK}\n{}", e.message),
                }
            }
        }
    }

    // A log write failure must not fail the reply.
    fn record_exchange(&self, user_id: &str, input: &str, output: &str) {
        let entry = LogEntry::now(
            user_id,
            self.store.active_system_message(user_id),
            input,
            output,
        );
        if let Err(e) = self.logs.write_log(&entry) {
            tracing::error!(user_id = %user_id, error = %e, "failed to write chat log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatClient, ChatError, Message};
    use crate::logstore::LogFilter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted stand-in for the completion API
    struct MockClient {
        responses: Mutex<Vec<Result<Message, ChatError>>>,
        seen_histories: Mutex<Vec<Vec<Message>>>,
    }

    impl MockClient {
        fn new(responses: Vec<Result<Message, ChatError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen_histories: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for MockClient {
        async fn complete(
            &self,
            messages: &[Message],
            _model_engine: &str,
        ) -> Result<Message, ChatError> {
            self.seen_histories.lock().unwrap().push(messages.to_vec());
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn dispatcher_with(
        user_id: &str,
        responses: Vec<Result<Message, ChatError>>,
    ) -> (Dispatcher, Arc<MockClient>) {
        let store = Arc::new(ConversationStore::new("default system".to_string(), 2));
        let bindings = Arc::new(ClientBindings::new("unused-key".to_string()));
        let client = Arc::new(MockClient::new(responses));
        bindings.bind(user_id, client.clone());
        let dispatcher = Dispatcher::new(
            store,
            bindings,
            ChatLogStore::open_in_memory().unwrap(),
            "test-engine".to_string(),
            "/system".to_string(),
        );
        (dispatcher, client)
    }

    #[tokio::test]
    async fn successful_turn_appends_both_sides_and_replies() {
        let (dispatcher, client) =
            dispatcher_with("u1", vec![Ok(Message::assistant("hello back"))]);

        let reply = dispatcher.handle_text("u1", "hello").await;
        assert_eq!(reply, "hello back");

        let history = dispatcher.store.get("u1");
        assert_eq!(
            history,
            vec![
                Message::system("default system"),
                Message::user("hello"),
                Message::assistant("hello back"),
            ]
        );

        // The model saw the history up to and including the user turn.
        let seen = client.seen_histories.lock().unwrap();
        assert_eq!(seen[0].last().unwrap(), &Message::user("hello"));
    }

    #[tokio::test]
    async fn successful_turn_is_logged() {
        let (dispatcher, _client) = dispatcher_with("u1", vec![Ok(Message::assistant("pong"))]);
        dispatcher.handle_text("u1", "ping").await;

        let logs = dispatcher.logs.query_logs(&LogFilter::default()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_id, "u1");
        assert_eq!(logs[0].prompt, "default system");
        assert_eq!(logs[0].input_text, "ping");
        assert_eq!(logs[0].output_text, "pong");
    }

    #[tokio::test]
    async fn auth_error_replies_with_fallback_and_records_no_assistant_turn() {
        let (dispatcher, _client) =
            dispatcher_with("u1", vec![Err(ChatError::auth("bad key"))]);

        let reply = dispatcher.handle_text("u1", "hello").await;
        assert_eq!(reply, AUTH_FALLBACK);

        let history = dispatcher.store.get("u1");
        assert_eq!(
            history,
            vec![Message::system("default system"), Message::user("hello")]
        );
        assert!(dispatcher
            .logs
            .query_logs(&LogFilter::default())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_turn_stays_in_context_for_the_retry() {
        let (dispatcher, client) = dispatcher_with(
            "u1",
            vec![
                Err(ChatError::transient("timeout")),
                Ok(Message::assistant("finally")),
            ],
        );

        let reply = dispatcher.handle_text("u1", "first").await;
        assert_eq!(reply, TRANSIENT_FALLBACK);

        let reply = dispatcher.handle_text("u1", "second").await;
        assert_eq!(reply, "finally");

        // The retry call saw the unanswered first message.
        let seen = client.seen_histories.lock().unwrap();
        assert_eq!(
            seen[1][1..],
            [Message::user("first"), Message::user("second")]
        );
    }

    #[tokio::test]
    async fn other_errors_surface_the_provider_message() {
        let (dispatcher, _client) =
            dispatcher_with("u1", vec![Err(ChatError::other("quota exceeded"))]);

        let reply = dispatcher.handle_text("u1", "hello").await;
        assert!(reply.starts_with(OTHER_FALLBACK));
        assert!(reply.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn overloaded_error_uses_its_fallback() {
        let (dispatcher, _client) =
            dispatcher_with("u1", vec![Err(ChatError::overloaded("slow down"))]);

        let reply = dispatcher.handle_text("u1", "hello").await;
        assert_eq!(reply, OVERLOADED_FALLBACK);
    }

    #[tokio::test]
    async fn system_command_updates_override_and_confirms() {
        let (dispatcher, _client) =
            dispatcher_with("u1", vec![Ok(Message::assistant("ok"))]);

        let reply = dispatcher.handle_text("u1", "/system  Talk like a pirate  ").await;
        assert_eq!(reply, COMMAND_CONFIRMATION);
        assert!(dispatcher.store.get("u1").is_empty());

        dispatcher.handle_text("u1", "hi").await;
        assert_eq!(
            dispatcher.store.get("u1")[0],
            Message::system("Talk like a pirate")
        );
    }

    #[tokio::test]
    async fn inbound_text_is_trimmed_before_dispatch() {
        let (dispatcher, _client) =
            dispatcher_with("u1", vec![Ok(Message::assistant("ok"))]);

        dispatcher.handle_text("u1", "  hello  ").await;
        assert_eq!(dispatcher.store.get("u1")[1], Message::user("hello"));
    }
}
