use std::collections::VecDeque;

use chatrelay_common::{ChatRole, StoredMessage};
use dashmap::DashMap;

/// In-process, per-user bounded message log. Keys are plain user ids: history
/// survives until an explicit clear or process exit, with no calendar-day
/// reset. Logs are created lazily on first append and evicted oldest-first
/// once they exceed the cap.
///
/// DashMap shard locks serialize mutation per key, so concurrent turns for
/// different users never interfere and racing appends for one user both land
/// (in whichever order the dispatches complete).
pub struct ConversationStore {
    logs: DashMap<String, VecDeque<StoredMessage>>,
    cap: usize,
}

impl ConversationStore {
    pub fn new(cap: usize) -> Self {
        Self {
            logs: DashMap::new(),
            cap,
        }
    }

    pub fn append(&self, key: &str, role: ChatRole, content: impl Into<String>) {
        let mut log = self.logs.entry(key.to_string()).or_default();
        log.push_back(StoredMessage::new(role, content));
        while log.len() > self.cap {
            log.pop_front();
        }
    }

    /// Full retained log in insertion order; empty for unseen keys.
    pub fn history(&self, key: &str) -> Vec<StoredMessage> {
        self.logs
            .get(key)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.logs.get(key).map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    /// Drop the log entirely. A no-op for unseen keys; a later append
    /// recreates the log lazily.
    pub fn clear(&self, key: &str) {
        self.logs.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_keeps_newest_cap_messages() {
        let store = ConversationStore::new(20);
        for i in 1..=25 {
            store.append("u1", ChatRole::User, format!("msg-{i}"));
        }

        let history = store.history("u1");
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "msg-6");
        assert_eq!(history[19].content, "msg-25");
    }

    #[test]
    fn keys_are_independent() {
        let store = ConversationStore::new(10);
        store.append("a", ChatRole::User, "from a");
        store.append("b", ChatRole::User, "from b");

        assert_eq!(store.len("a"), 1);
        assert_eq!(store.history("b")[0].content, "from b");
        store.clear("a");
        assert_eq!(store.len("a"), 0);
        assert_eq!(store.len("b"), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let store = ConversationStore::new(10);
        store.append("u1", ChatRole::User, "hello");
        store.clear("u1");
        assert!(store.history("u1").is_empty());
        // Second clear on an already-empty key must not panic or error.
        store.clear("u1");
        assert!(store.history("u1").is_empty());

        store.append("u1", ChatRole::User, "again");
        assert_eq!(store.len("u1"), 1);
    }

    #[test]
    fn unseen_key_reads_empty() {
        let store = ConversationStore::new(10);
        assert!(store.history("nobody").is_empty());
        assert!(store.is_empty("nobody"));
    }

    #[test]
    fn concurrent_appends_all_land() {
        use std::sync::Arc;

        let store = Arc::new(ConversationStore::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append("shared", ChatRole::User, format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len("shared"), 400);
    }
}
