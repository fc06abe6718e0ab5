use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use nadia_core::{HistoryTurn, UserId};

use crate::summary::summarize;

/// Maximum cache entries before FIFO eviction.
const MAX_CACHE_ENTRIES: usize = 256;
/// Cached context expires after 5 minutes, same as the teacher's memory
/// manager, so a stale rendering never outlives a fast-moving conversation.
const CACHE_TTL: Duration = Duration::from_secs(300);

struct Entry {
    context: Option<String>,
    expires_at: Instant,
}

/// Short-term cache of each user's rendered conversation-summary context, so
/// the pipeline doesn't re-render it from history on every pipeline stage
/// within the same batch. This is the small, short-term profile cache the
/// spec's Non-goals allow in place of long-term vector memory — it holds a
/// rendered string, never raw history or embeddings.
pub struct UserProfileCache {
    entries: Mutex<HashMap<UserId, Entry>>,
    order: Mutex<Vec<UserId>>,
}

impl UserProfileCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()), order: Mutex::new(Vec::new()) }
    }

    /// Returns the cached rendered context for `user_id` if still fresh,
    /// otherwise renders it from `history` via [`summarize`] and caches it.
    pub fn get_or_render(&self, user_id: &UserId, history: &[HistoryTurn]) -> Option<String> {
        if let Some(context) = self.cached(user_id) {
            return context;
        }
        let rendered = summarize(history);
        self.insert(user_id.clone(), rendered.clone());
        rendered
    }

    /// Drops any cached context for `user_id`, forcing the next
    /// `get_or_render` to recompute it. Called whenever a new turn is
    /// appended to that user's history.
    pub fn invalidate(&self, user_id: &UserId) {
        self.entries.lock().unwrap().remove(user_id);
    }

    fn cached(&self, user_id: &UserId) -> Option<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(user_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.context.clone()),
            Some(_) => {
                entries.remove(user_id);
                None
            }
            None => None,
        }
    }

    fn insert(&self, user_id: UserId, context: Option<String>) {
        let mut entries = self.entries.lock().unwrap();
        let mut order = self.order.lock().unwrap();

        if !entries.contains_key(&user_id) {
            order.push(user_id.clone());
            if order.len() > MAX_CACHE_ENTRIES {
                let evicted = order.remove(0);
                entries.remove(&evicted);
            }
        }
        entries.insert(user_id, Entry { context, expires_at: Instant::now() + CACHE_TTL });
    }
}

impl Default for UserProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nadia_core::Role;

    fn turn(content: &str) -> HistoryTurn {
        HistoryTurn { role: Role::User, content: content.to_string(), timestamp: Utc::now() }
    }

    #[test]
    fn caches_rendered_context_across_calls() {
        let cache = UserProfileCache::new();
        let user = UserId::from("u1".to_string());
        let history = vec![turn("hello")];

        let first = cache.get_or_render(&user, &history);
        let second = cache.get_or_render(&user, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn invalidate_forces_rerender() {
        let cache = UserProfileCache::new();
        let user = UserId::from("u1".to_string());

        let empty = cache.get_or_render(&user, &[]);
        assert_eq!(empty, None);

        cache.invalidate(&user);
        let rendered = cache.get_or_render(&user, &[turn("hi")]);
        assert!(rendered.is_some());
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let cache = UserProfileCache::new();
        for i in 0..(MAX_CACHE_ENTRIES + 1) {
            let user = UserId::from(format!("u{i}"));
            cache.get_or_render(&user, &[turn("x")]);
        }
        assert_eq!(cache.order.lock().unwrap().len(), MAX_CACHE_ENTRIES);
    }
}
