use std::sync::Arc;

use nadia_core::config::ReviewConfig;
use nadia_core::model::Interaction;
use nadia_store_db::{ApproveOutcome, InteractionRepository};
use nadia_store_kv::keys::REVIEW_QUEUE;
use nadia_store_kv::{KvStore, OutboundQueue};
use tracing::{info, instrument, warn};

use crate::error::Result;

/// Backs the pending-review priority queue with a KV sorted set (source of
/// truth for "what needs a human look, in what order") and hydrates full
/// rows from the relational store on read.
///
/// Invariant: an interaction id is present in the sorted set if and only if
/// its row's `review_status` is `pending`. `approve`/`reject` keep both
/// stores in lockstep.
pub struct ReviewQueue {
    kv: KvStore,
    repo: Arc<InteractionRepository>,
    outbound: OutboundQueue,
    risk_weight: f64,
    aging_rate: f64,
}

impl ReviewQueue {
    pub fn new(kv: KvStore, repo: Arc<InteractionRepository>, config: &ReviewConfig) -> Self {
        let outbound = OutboundQueue::new(kv.clone());
        Self { kv, repo, outbound, risk_weight: config.risk_weight, aging_rate: config.aging_rate }
    }

    /// `priority = risk * risk_weight + age_penalty`, recomputed relative to
    /// the interaction's own `created_at` so the score keeps rising the
    /// longer a row waits. `ZREVRANGE`'s tie-break is descending member
    /// string order, not insertion order, so ties can't be relied on to
    /// order by arrival — the age term is what keeps old items surfacing.
    #[instrument(skip(self, interaction), fields(id = %interaction.id))]
    pub async fn enqueue(&self, interaction: &Interaction) -> Result<()> {
        let risk = interaction.constitution_risk_score.unwrap_or(0.0);
        let age_seconds = (chrono::Utc::now() - interaction.created_at).num_seconds().max(0) as f64;
        let priority = risk * self.risk_weight + age_seconds * self.aging_rate;
        self.kv.zadd(REVIEW_QUEUE, interaction.id.as_str(), priority).await?;
        info!(id = %interaction.id, priority, "enqueued for review");
        Ok(())
    }

    /// Highest-priority pending reviews first, hydrated from the relational
    /// store. Entries whose row vanished (never committed, or reaped by a
    /// concurrent cleanup) are pruned from the set rather than surfaced.
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<Interaction>> {
        let ids = self.kv.zrevrange(REVIEW_QUEUE, limit as isize).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.repo.get(&id).await {
                Ok(interaction) => out.push(interaction),
                Err(_) => {
                    warn!(id, "pending review id had no matching row, pruning");
                    let _ = self.kv.zrem(REVIEW_QUEUE, &id).await;
                }
            }
        }
        Ok(out)
    }

    #[instrument(skip(self, final_bubbles, edit_tags, notes))]
    pub async fn approve(
        &self,
        id: &str,
        final_bubbles: &[String],
        edit_tags: &[String],
        quality_score: Option<i32>,
        notes: Option<&str>,
    ) -> Result<()> {
        let outcome = self.repo.approve(id, final_bubbles, edit_tags, quality_score, notes).await?;
        self.kv.zrem(REVIEW_QUEUE, id).await?;
        match outcome {
            ApproveOutcome::Applied => {
                self.outbound.push(id).await?;
                info!(id, "review approved, queued for send");
            }
            ApproveOutcome::AlreadyApplied => {
                info!(id, "repeat approve call, skipping duplicate send");
            }
        }
        Ok(())
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(&self, id: &str, reason: &str) -> Result<()> {
        self.repo.reject(id, reason).await?;
        self.kv.zrem(REVIEW_QUEUE, id).await?;
        info!(id, "review rejected");
        Ok(())
    }

    /// Patch the draft in place while it's still pending; does not affect
    /// queue ordering or status.
    #[instrument(skip(self, final_bubbles, edit_tags))]
    pub async fn edit(&self, id: &str, final_bubbles: &[String], edit_tags: &[String]) -> Result<()> {
        self.repo.edit_draft(id, final_bubbles, edit_tags).await?;
        Ok(())
    }

    pub async fn depth(&self) -> Result<i64> {
        Ok(self.kv.zcard(REVIEW_QUEUE).await?)
    }
}
