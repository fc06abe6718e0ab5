use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nadia_core::config::IdentityConfig;
use nadia_core::{ChatTransport, CoreError, PeerHandle, UserId};
use tracing::{debug, info, warn};

/// How often `maybe_cleanup` is allowed to actually run, regardless of how
/// often it's called.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Keeps platform peer entities resolved before the pipeline needs to send
/// typing actions or messages, so a cold cache never shows up as a
/// user-visible `PeerIdInvalid`-style error mid-conversation.
///
/// Caches the (channel-agnostic) `UserId -> PeerHandle` mapping in memory.
/// Eviction is a simple insertion-order FIFO over `cache_order`, same as
/// resolving identities elsewhere in this pipeline — a real LRU isn't
/// justified until profiling says otherwise.
pub struct EntityResolver<T: ChatTransport> {
    transport: Arc<T>,
    config: IdentityConfig,
    cache: Mutex<HashMap<UserId, PeerHandle>>,
    cache_order: Mutex<Vec<UserId>>,
    attempts: Mutex<HashMap<UserId, u32>>,
    last_cleanup: Mutex<Instant>,
}

impl<T: ChatTransport> EntityResolver<T> {
    pub fn new(transport: Arc<T>, config: IdentityConfig) -> Self {
        Self {
            transport,
            config,
            cache: Mutex::new(HashMap::new()),
            cache_order: Mutex::new(Vec::new()),
            attempts: Mutex::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    /// Guarantees a resolved peer handle for `user_id`, resolving it on
    /// first use and caching the result. Retries are bounded by
    /// `config.max_retries`; once exhausted, callers get `CoreError::NotFound`
    /// until a success resets the counter.
    pub async fn ensure_resolved(&self, user_id: &UserId) -> Result<PeerHandle, CoreError> {
        if let Some(peer) = self.cache_lookup(user_id) {
            debug!(%user_id, "entity cache hit");
            return Ok(peer);
        }
        self.resolve_for_typing(user_id).await
    }

    /// Best-effort pre-resolution for a newly arrived message, run in the
    /// background without blocking message processing. Errors are logged,
    /// never propagated.
    pub async fn preload(&self, user_id: &UserId) {
        if self.cache_lookup(user_id).is_some() {
            return;
        }
        if let Err(e) = self.resolve_for_typing(user_id).await {
            warn!(%user_id, error = %e, "failed to preload entity");
        }
    }

    /// Resolve a bounded set of already-known user ids up front (e.g. users
    /// with recent activity pulled from storage), so the first real message
    /// after boot doesn't pay a cold-resolve penalty. Stops at
    /// `config.warm_up_limit`.
    pub async fn warm_up(&self, candidate_user_ids: &[UserId]) -> usize {
        let mut resolved = 0;
        for user_id in candidate_user_ids.iter().take(self.config.warm_up_limit) {
            if self.cache_lookup(user_id).is_some() {
                continue;
            }
            if self.resolve_for_typing(user_id).await.is_ok() {
                resolved += 1;
            }
        }
        info!(resolved, limit = self.config.warm_up_limit, "entity warm-up completed");
        resolved
    }

    async fn resolve_for_typing(&self, user_id: &UserId) -> Result<PeerHandle, CoreError> {
        let attempts = self.attempt_count(user_id);
        if attempts >= self.config.max_retries {
            warn!(%user_id, attempts, "max retry attempts reached for entity resolution");
            return Err(CoreError::NotFound { id: user_id.to_string() });
        }
        self.bump_attempts(user_id);

        let resolved = match self.transport.resolve_input_entity(user_id).await {
            Ok(peer) => Ok(peer),
            Err(_) => self.transport.resolve_entity(user_id).await,
        };

        match resolved {
            Ok(peer) => {
                self.cache_insert(user_id.clone(), peer.clone());
                self.clear_attempts(user_id);
                self.maybe_cleanup();
                debug!(%user_id, "entity resolved");
                Ok(peer)
            }
            Err(e) => {
                warn!(%user_id, attempts = attempts + 1, error = %e, "failed to resolve entity");
                Err(e)
            }
        }
    }

    fn attempt_count(&self, user_id: &UserId) -> u32 {
        self.attempts.lock().unwrap().get(user_id).copied().unwrap_or(0)
    }

    fn bump_attempts(&self, user_id: &UserId) {
        *self.attempts.lock().unwrap().entry(user_id.clone()).or_insert(0) += 1;
    }

    fn clear_attempts(&self, user_id: &UserId) {
        self.attempts.lock().unwrap().remove(user_id);
    }

    fn cache_lookup(&self, user_id: &UserId) -> Option<PeerHandle> {
        self.cache.lock().unwrap().get(user_id).cloned()
    }

    fn cache_insert(&self, user_id: UserId, peer: PeerHandle) {
        let mut cache = self.cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();

        if cache.insert(user_id.clone(), peer).is_some() {
            return;
        }

        if cache.len() > self.config.cache_capacity {
            let evict_count = self.config.cache_capacity / 2;
            let order_len = order.len();
            let to_remove: Vec<_> = order.drain(..evict_count.min(order_len)).collect();
            for key in to_remove {
                cache.remove(&key);
            }
        }
        order.push(user_id);
    }

    /// Hourly, at most: trims failed-attempt bookkeeping for users that
    /// exhausted their retries, mirroring the reference cleanup cadence.
    fn maybe_cleanup(&self) {
        let mut last = self.last_cleanup.lock().unwrap();
        if last.elapsed() < CLEANUP_INTERVAL {
            return;
        }
        *last = Instant::now();

        let mut attempts = self.attempts.lock().unwrap();
        let before = attempts.len();
        attempts.retain(|_, count| *count < self.config.max_retries);
        let removed = before - attempts.len();
        if removed > 0 {
            debug!(removed, "cleaned up exhausted entity resolution attempts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyTransport {
        input_entity_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for FlakyTransport {
        async fn resolve_input_entity(&self, _user_id: &UserId) -> Result<PeerHandle, CoreError> {
            self.input_entity_calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Transport("input entity unavailable".into()))
        }

        async fn resolve_entity(&self, user_id: &UserId) -> Result<PeerHandle, CoreError> {
            Ok(PeerHandle(user_id.to_string()))
        }

        async fn set_typing(&self, _peer: &PeerHandle, _typing: bool) -> Result<(), CoreError> {
            Ok(())
        }

        async fn send_message(&self, _peer: &PeerHandle, _text: &str) -> Result<String, CoreError> {
            Ok("msg-1".into())
        }
    }

    struct AlwaysFailTransport;

    #[async_trait]
    impl ChatTransport for AlwaysFailTransport {
        async fn resolve_input_entity(&self, _user_id: &UserId) -> Result<PeerHandle, CoreError> {
            Err(CoreError::Transport("down".into()))
        }
        async fn resolve_entity(&self, _user_id: &UserId) -> Result<PeerHandle, CoreError> {
            Err(CoreError::Transport("down".into()))
        }
        async fn set_typing(&self, _peer: &PeerHandle, _typing: bool) -> Result<(), CoreError> {
            Ok(())
        }
        async fn send_message(&self, _peer: &PeerHandle, _text: &str) -> Result<String, CoreError> {
            Ok("unused".into())
        }
    }

    fn config() -> IdentityConfig {
        IdentityConfig { cache_capacity: 4, max_retries: 3, warm_up_limit: 10 }
    }

    #[tokio::test]
    async fn falls_back_to_full_entity_resolution() {
        let transport = Arc::new(FlakyTransport { input_entity_calls: AtomicUsize::new(0) });
        let resolver = EntityResolver::new(transport, config());
        let user_id = UserId::from("u1");

        let peer = resolver.ensure_resolved(&user_id).await.unwrap();
        assert_eq!(peer.as_str(), "u1");

        // cached on second call — no extra resolution attempts recorded.
        let peer_again = resolver.ensure_resolved(&user_id).await.unwrap();
        assert_eq!(peer_again.as_str(), "u1");
    }

    #[tokio::test]
    async fn stops_retrying_after_max_attempts() {
        let transport = Arc::new(AlwaysFailTransport);
        let resolver = EntityResolver::new(transport, config());
        let user_id = UserId::from("u2");

        for _ in 0..3 {
            assert!(resolver.ensure_resolved(&user_id).await.is_err());
        }
        // fourth call should short-circuit on the attempt-count check, not
        // touch the transport again, and still return an error.
        assert!(resolver.ensure_resolved(&user_id).await.is_err());
    }

    #[tokio::test]
    async fn cache_evicts_oldest_half_when_full() {
        let transport = Arc::new(FlakyTransport { input_entity_calls: AtomicUsize::new(0) });
        let resolver = EntityResolver::new(transport, config());

        for i in 0..6 {
            let user_id = UserId::from(format!("u{i}"));
            resolver.ensure_resolved(&user_id).await.unwrap();
        }

        assert!(resolver.cache.lock().unwrap().len() <= config().cache_capacity);
    }
}
