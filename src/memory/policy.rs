//! History retention policy
//!
//! Bounds per-user history growth while keeping the system message and the
//! most recent turns. `pairs` is the number of user+assistant turn pairs to
//! retain after a trim.

use crate::llm::Message;

/// History length at which a trim fires. Deliberately one full pair above
/// the post-trim length of `2 * pairs + 1`, so trimming happens in a
/// hysteresis band instead of on every append.
pub fn trim_threshold(pairs: usize) -> usize {
    (pairs + 1) * 2 + 1
}

/// Trim `history` in place: once it reaches the threshold, keep element 0
/// (the system message) plus the last `2 * pairs` turns. Below the
/// threshold the history is untouched.
pub fn trim(history: &mut Vec<Message>, pairs: usize) {
    if history.len() < trim_threshold(pairs) {
        return;
    }
    let tail = history.split_off(history.len() - pairs * 2);
    history.truncate(1);
    history.extend(tail);
}
