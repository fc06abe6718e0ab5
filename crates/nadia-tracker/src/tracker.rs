use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use nadia_core::config::TrackerConfig;
use nadia_core::UserId;
use nadia_store_kv::{BufferStore, KvStore, TypingStateStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{FlushedBatch, PendingMessage};

/// Adaptive-window activity tracker: buffers rapid-fire messages from a
/// single user into one batch instead of dispatching each through the LLM
/// pipeline separately.
///
/// Phase 1 is a short fixed window (`window_delay_secs`) that distinguishes
/// a single message from a burst. If a burst is detected, phase 2 waits for
/// the user to stop typing (debounced), capped at `max_batch_wait_secs` and
/// cut short early once `max_batch_size` messages have arrived. Every new
/// message restarts phase 1 for that user, mirroring the reference
/// implementation's cancel-and-reschedule timer.
pub struct ActivityTracker {
    config: TrackerConfig,
    buffers: Arc<DashMap<UserId, Vec<PendingMessage>>>,
    timers: Arc<DashMap<UserId, JoinHandle<()>>>,
    buffer_store: BufferStore,
    typing_store: TypingStateStore,
    dispatch_tx: mpsc::Sender<FlushedBatch>,
}

impl ActivityTracker {
    pub fn new(config: TrackerConfig, kv: KvStore, dispatch_tx: mpsc::Sender<FlushedBatch>) -> Arc<Self> {
        Arc::new(Self {
            config,
            buffers: Arc::new(DashMap::new()),
            timers: Arc::new(DashMap::new()),
            buffer_store: BufferStore::new(kv.clone()),
            typing_store: TypingStateStore::new(kv),
            dispatch_tx,
        })
    }

    /// Record an incoming message and (re)start the adaptive window for its
    /// sender. Returns once the message has been buffered; the window itself
    /// runs in a background task.
    pub async fn handle_message(self: &Arc<Self>, user_id: UserId, text: String) -> nadia_store_kv::Result<()> {
        let pending = PendingMessage { text, arrived_at: chrono::Utc::now() };

        {
            let mut entry = self.buffers.entry(user_id.clone()).or_default();
            entry.push(pending);
        }
        self.mirror_buffer(&user_id).await?;

        if let Some((_, old)) = self.timers.remove(&user_id) {
            old.abort();
        }

        let this = Arc::clone(self);
        let uid = user_id.clone();
        let handle = tokio::spawn(async move { this.run_window(uid).await });
        self.timers.insert(user_id, handle);

        Ok(())
    }

    /// Mark the user as currently typing or not, backing the debounce check
    /// in phase 2.
    pub async fn set_typing(&self, user_id: &UserId, typing: bool) -> nadia_store_kv::Result<()> {
        self.typing_store.set_typing(user_id, typing).await
    }

    /// Restore any buffers a previous process left behind in Redis (crash
    /// recovery): loads them into memory and immediately flushes, since no
    /// window timer survived the restart to close them gracefully.
    pub async fn recover_pending_buffers(self: &Arc<Self>) -> nadia_store_kv::Result<usize> {
        let user_ids = self.buffer_store.buffered_user_ids().await?;
        let mut recovered = 0;
        for raw_id in user_ids {
            let user_id = UserId::from(raw_id);
            let messages = self.buffer_store.load(&user_id).await?;
            if messages.is_empty() {
                continue;
            }
            let pending: Vec<PendingMessage> = messages.into_iter().map(PendingMessage::from).collect();
            self.buffers.insert(user_id.clone(), pending);
            recovered += 1;
            self.process_buffer(user_id).await?;
        }
        Ok(recovered)
    }

    async fn run_window(self: Arc<Self>, user_id: UserId) {
        tokio::time::sleep(Duration::from_secs_f64(self.config.window_delay_secs)).await;

        let buffer_size = self.buffers.get(&user_id).map(|b| b.len()).unwrap_or(0);

        if buffer_size >= self.config.min_batch_size {
            info!(user = %user_id, buffer_size, "rapid messages detected, entering batching mode");
            self.wait_for_typing_completion(&user_id).await;
        } else {
            info!(user = %user_id, "single message, processing immediately");
        }

        if let Err(e) = self.process_buffer(user_id.clone()).await {
            warn!(user = %user_id, error = %e, "failed to process buffer");
        }
        self.timers.remove(&user_id);
    }

    /// Phase 2: poll typing state until it settles, the hard cap elapses, or
    /// the buffer fills to `max_batch_size`.
    async fn wait_for_typing_completion(&self, user_id: &UserId) {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs_f64(self.config.max_batch_wait_secs);

        while tokio::time::Instant::now() < deadline {
            let is_typing = self.typing_store.is_typing(user_id).await.unwrap_or(false);

            if !is_typing {
                tokio::time::sleep(Duration::from_secs_f64(self.config.debounce_delay_secs)).await;
                let still_typing = self.typing_store.is_typing(user_id).await.unwrap_or(false);
                if !still_typing {
                    info!(user = %user_id, "typing completed");
                    return;
                }
                debug!(user = %user_id, "resumed typing during debounce");
            }

            let current_size = self.buffers.get(user_id).map(|b| b.len()).unwrap_or(0);
            if current_size >= self.config.max_batch_size {
                info!(user = %user_id, current_size, "max batch size reached");
                return;
            }

            tokio::time::sleep(Duration::from_secs_f64(self.config.typing_poll_interval_secs)).await;
        }

        warn!(user = %user_id, "max wait time reached, processing anyway");
    }

    async fn process_buffer(&self, user_id: UserId) -> nadia_store_kv::Result<()> {
        let Some((_, messages)) = self.buffers.remove(&user_id) else {
            return Ok(());
        };
        if messages.is_empty() {
            return Ok(());
        }

        let batch = FlushedBatch { user_id: user_id.clone(), messages };
        let savings = batch.estimated_savings_pct();
        info!(
            user = %user_id,
            messages = batch.messages.len(),
            estimated_savings_pct = savings,
            "buffer flushed"
        );

        if let Err(mpsc::error::SendError(batch)) = self.dispatch_tx.send(batch).await {
            warn!(user = %user_id, "dispatch channel closed, re-enqueuing flushed batch to WAL");
            let snapshot: Vec<nadia_store_kv::BufferedMessage> =
                batch.messages.iter().map(Into::into).collect();
            self.buffer_store.save(&user_id, &snapshot).await?;
            return Ok(());
        }

        self.buffer_store.clear(&user_id).await?;
        Ok(())
    }

    async fn mirror_buffer(&self, user_id: &UserId) -> nadia_store_kv::Result<()> {
        let snapshot: Vec<nadia_store_kv::BufferedMessage> = self
            .buffers
            .get(user_id)
            .map(|b| b.iter().map(Into::into).collect())
            .unwrap_or_default();
        self.buffer_store.save(user_id, &snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_savings_is_zero_for_single_message() {
        let batch = FlushedBatch {
            user_id: UserId::from("u1"),
            messages: vec![PendingMessage { text: "hi".into(), arrived_at: chrono::Utc::now() }],
        };
        assert_eq!(batch.estimated_savings_pct(), 0.0);
    }

    #[test]
    fn estimated_savings_grows_with_batch_size() {
        let messages = (0..4)
            .map(|i| PendingMessage { text: format!("m{i}"), arrived_at: chrono::Utc::now() })
            .collect();
        let batch = FlushedBatch { user_id: UserId::from("u1"), messages };
        assert_eq!(batch.estimated_savings_pct(), 75.0);
    }
}
