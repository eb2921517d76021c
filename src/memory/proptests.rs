//! Property-based tests for the history retention policy
//!
//! Invariants verified:
//! - element 0 (the system message) is never dropped
//! - trimming is idempotent
//! - the retained turns are a contiguous suffix of the original sequence
//! - trimmed length never exceeds `2 * pairs + 1`

use super::policy::{trim, trim_threshold};
use super::ConversationStore;
use crate::llm::{Message, Role};
use proptest::prelude::*;

fn arb_history() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec("[a-z0-9 ]{0,20}", 1..40).prop_map(|contents| {
        let mut history = vec![Message::system("sys")];
        for (i, content) in contents.into_iter().enumerate() {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            history.push(Message::new(role, content));
        }
        history
    })
}

proptest! {
    #[test]
    fn first_element_is_preserved(mut history in arb_history(), pairs in 0usize..8) {
        let first = history[0].clone();
        trim(&mut history, pairs);
        prop_assert_eq!(&history[0], &first);
    }

    #[test]
    fn trim_is_idempotent(mut history in arb_history(), pairs in 0usize..8) {
        trim(&mut history, pairs);
        let once = history.clone();
        trim(&mut history, pairs);
        prop_assert_eq!(history, once);
    }

    #[test]
    fn trimmed_turns_are_a_contiguous_suffix(history in arb_history(), pairs in 0usize..8) {
        let mut trimmed = history.clone();
        trim(&mut trimmed, pairs);
        prop_assert!(history.ends_with(&trimmed[1..]));
    }

    #[test]
    fn trimmed_length_is_bounded(mut history in arb_history(), pairs in 0usize..8) {
        let original_len = history.len();
        trim(&mut history, pairs);
        if original_len >= trim_threshold(pairs) {
            prop_assert_eq!(history.len(), 2 * pairs + 1);
        } else {
            prop_assert_eq!(history.len(), original_len);
        }
    }

    // Store-level version of the ordering invariant: however many turns are
    // appended, the history starts with the system message and the turns
    // are the most recent ones in insertion order.
    #[test]
    fn store_history_keeps_chronological_suffix(
        contents in prop::collection::vec("[a-z]{1,8}", 1..30),
        pairs in 0usize..5,
    ) {
        let store = ConversationStore::new("sys".to_string(), pairs);
        for (i, content) in contents.iter().enumerate() {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append("u", role, content.clone());
        }

        let history = store.get("u");
        prop_assert_eq!(history[0].role, Role::System);
        let turns: Vec<String> = history[1..].iter().map(|m| m.content.clone()).collect();
        prop_assert!(turns.len() <= contents.len());
        let expected: Vec<String> = contents[contents.len() - turns.len()..].to_vec();
        prop_assert_eq!(turns, expected);
    }
}
