use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use nadia_core::ChatTransport;
use nadia_identity::EntityResolver;
use nadia_store_db::InteractionRepository;
use nadia_store_kv::{KvStore, OutboundQueue};
use tracing::{info, warn};

use crate::pacing::{inter_bubble_pause_secs, initial_thinking_pause_secs, reading_pause_secs, typing_duration_secs};
use crate::typing::TypingHandle;

/// Bounded retries before a send failure is given up on and marked failed
/// rather than redelivered forever.
const MAX_SEND_ATTEMPTS: u32 = 3;
/// How long to block waiting on the outbound queue before looping again to
/// check for shutdown.
const POLL_TIMEOUT_SECS: f64 = 1.0;

/// Drains the outbound queue and delivers approved interactions with
/// human-like pacing: a reading/thinking pause, then per-bubble typing
/// indicators and send, with jittered pauses between bubbles.
pub struct PacedSender<T: ChatTransport + 'static> {
    transport: Arc<T>,
    resolver: Arc<EntityResolver<T>>,
    outbound: OutboundQueue,
    repo: Arc<InteractionRepository>,
    typing_words_per_minute: f64,
    attempts: Mutex<HashMap<String, u32>>,
}

impl<T: ChatTransport + 'static> PacedSender<T> {
    pub fn new(
        transport: Arc<T>,
        resolver: Arc<EntityResolver<T>>,
        kv: KvStore,
        repo: Arc<InteractionRepository>,
        typing_words_per_minute: f64,
    ) -> Self {
        Self {
            transport,
            resolver,
            outbound: OutboundQueue::new(kv),
            repo,
            typing_words_per_minute,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Runs until `shutdown` fires, blocking on the outbound queue in
    /// between deliveries.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!("paced sender started");
        loop {
            tokio::select! {
                popped = self.outbound.pop(POLL_TIMEOUT_SECS) => {
                    match popped {
                        Ok(Some(id)) => {
                            if let Err(e) = self.deliver(&id).await {
                                self.handle_failure(&id, &e.to_string()).await;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "outbound queue poll failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("paced sender shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn deliver(&self, id: &str) -> Result<(), SendError> {
        let interaction = self.repo.get(id).await.map_err(|e| SendError(e.to_string()))?;
        let user_id = interaction.user_id.clone();
        let peer =
            self.resolver.ensure_resolved(&user_id).await.map_err(|e| SendError(e.to_string()))?;

        let initial_pause = if interaction.message_number == 0 {
            initial_thinking_pause_secs()
        } else {
            reading_pause_secs(&interaction.user_message)
        };
        tokio::time::sleep(std::time::Duration::from_secs_f64(initial_pause)).await;

        let bubbles: Vec<&String> = interaction
            .final_bubbles
            .iter()
            .filter(|b| !b.trim().is_empty())
            .collect();

        // Resume past bubbles a prior, partially-failed attempt already
        // delivered, so redelivery never resends what the user already saw.
        let already_sent = interaction.bubbles_sent.max(0) as usize;
        if already_sent >= bubbles.len() && !bubbles.is_empty() {
            warn!(id, already_sent, total = bubbles.len(), "all bubbles already sent, skipping redelivery");
        }
        let remaining = bubbles.iter().enumerate().skip(already_sent);

        for (i, bubble) in remaining {
            let typing = TypingHandle::start(Arc::clone(&self.transport), peer.clone());
            let duration = typing_duration_secs(bubble, self.typing_words_per_minute);
            tokio::time::sleep(std::time::Duration::from_secs_f64(duration)).await;
            typing.stop();

            self.transport
                .send_message(&peer, bubble.trim())
                .await
                .map_err(|e| SendError(e.to_string()))?;
            self.repo.bump_bubbles_sent(id).await.map_err(|e| SendError(e.to_string()))?;

            if i + 1 < bubbles.len() {
                tokio::time::sleep(std::time::Duration::from_secs_f64(inter_bubble_pause_secs())).await;
            }
        }

        self.repo.mark_sent(id).await.map_err(|e| SendError(e.to_string()))?;
        self.clear_attempts(id);
        info!(id, bubbles = bubbles.len(), "delivered interaction");
        Ok(())
    }

    async fn handle_failure(&self, id: &str, reason: &str) {
        let attempts = self.bump_attempts(id);
        if attempts >= MAX_SEND_ATTEMPTS {
            warn!(id, reason, attempts, "giving up on delivery");
            if let Err(e) = self.repo.mark_failed(id, reason).await {
                warn!(id, error = %e, "failed to mark interaction failed");
            }
            self.clear_attempts(id);
        } else {
            warn!(id, reason, attempts, "delivery failed, requeueing");
            if let Err(e) = self.outbound.push_front(id).await {
                warn!(id, error = %e, "failed to requeue after delivery failure");
            }
        }
    }

    fn bump_attempts(&self, id: &str) -> u32 {
        let mut attempts = self.attempts.lock().unwrap();
        let count = attempts.entry(id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn clear_attempts(&self, id: &str) {
        self.attempts.lock().unwrap().remove(id);
    }
}

#[derive(Debug)]
struct SendError(String);

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SendError {}
