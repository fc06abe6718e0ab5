use std::sync::Arc;

use nadia_core::{ConversationId, HistoryTurn, Interaction, Recommendation, Role};
use nadia_llm::{split_bubbles, LlmClient};
use nadia_review::ReviewQueue;
use nadia_safety::SafetyEvaluator;
use nadia_store_db::InteractionRepository;
use nadia_store_kv::{HistoryStore, WalEntry, WalQueue};
use nadia_tracker::FlushedBatch;
use tracing::{info, warn};

use crate::error::Result;
use crate::profile::UserProfileCache;

/// Drives one batch from the activity tracker through drafting, refinement,
/// safety evaluation, and review enqueueing. Every stage persists before the
/// next runs, so a crash mid-pipeline leaves enough state on the row for
/// `run_stages` to resume without redoing finished work.
pub struct Pipeline {
    repo: Arc<InteractionRepository>,
    history: HistoryStore,
    wal: WalQueue,
    llm: Arc<LlmClient>,
    safety: Arc<SafetyEvaluator>,
    review: Arc<ReviewQueue>,
    profiles: UserProfileCache,
}

impl Pipeline {
    pub fn new(
        repo: Arc<InteractionRepository>,
        history: HistoryStore,
        wal: WalQueue,
        llm: Arc<LlmClient>,
        safety: Arc<SafetyEvaluator>,
        review: Arc<ReviewQueue>,
    ) -> Self {
        Self { repo, history, wal, llm, safety, review, profiles: UserProfileCache::new() }
    }

    /// Entry point for a freshly flushed batch: allocates the interaction,
    /// durably records it, then runs it through to the review queue.
    pub async fn ingest(&self, batch: FlushedBatch) -> Result<()> {
        let conversation_id = ConversationId::for_user(&batch.user_id);
        let message_number = self.repo.last_message_number(conversation_id.as_str()).await? + 1;
        let text = batch.combined_text();

        let interaction =
            Interaction::new(batch.user_id.clone(), conversation_id, message_number, text);

        let entry = WalEntry {
            interaction_id: interaction.id.as_str().to_string(),
            user_id: interaction.user_id.as_str().to_string(),
            payload: serde_json::json!({
                "conversation_id": interaction.conversation_id.as_str(),
                "message_number": interaction.message_number,
                "user_message": interaction.user_message,
            }),
        };
        self.wal.push(&entry).await?;
        self.repo.insert(&interaction).await?;

        if let Err(e) = self
            .history
            .append(
                &interaction.user_id,
                HistoryTurn {
                    role: Role::User,
                    content: interaction.user_message.clone(),
                    timestamp: interaction.user_message_timestamp,
                },
            )
            .await
        {
            warn!(id = %interaction.id, error = %e, "failed to mirror inbound turn to history");
        }
        self.profiles.invalidate(&interaction.user_id);

        match self.run_stages(&interaction).await {
            Ok(()) => {
                self.wal.remove(&entry).await?;
            }
            Err(e) => {
                warn!(id = %interaction.id, error = %e, "pipeline failed before enqueue, marking failed");
                let _ = self.repo.mark_failed(interaction.id.as_str(), &e.to_string()).await;
            }
        }
        Ok(())
    }

    /// Runs whichever stages the row hasn't completed yet, ending with an
    /// (idempotent) enqueue into the review queue. Safe to call repeatedly on
    /// the same row, which is what the recovery agent relies on.
    pub async fn run_stages(&self, interaction: &Interaction) -> Result<()> {
        let id = interaction.id.as_str();

        let draft_text = if let Some(raw) = &interaction.llm1_raw_response {
            raw.clone()
        } else {
            let history = self.history.load(&interaction.user_id).await.unwrap_or_default();
            let summary = self.profiles.get_or_render(&interaction.user_id, &history);
            let draft =
                self.llm.draft(None, summary.as_deref(), &interaction.user_message).await?;
            self.repo
                .record_draft(id, &draft.text, &draft.model, draft.tokens_used as i64, draft.cost_usd)
                .await?;
            draft.text
        };

        let bubbles = if !interaction.llm2_bubbles.is_empty() {
            interaction.llm2_bubbles.clone()
        } else {
            let history = self.history.load(&interaction.user_id).await.unwrap_or_default();
            let summary = self.profiles.get_or_render(&interaction.user_id, &history);
            let refined = self.llm.refine(None, summary.as_deref(), &draft_text).await?;
            let bubbles = split_bubbles(&refined.text, self.llm.bubble_separator());
            let draft_cost = interaction.llm1_cost_usd.unwrap_or(0.0);
            let total_cost = draft_cost + refined.cost_usd;
            self.repo
                .record_refinement(
                    id,
                    &bubbles,
                    &refined.model,
                    refined.tokens_used as i64,
                    refined.cost_usd,
                    total_cost,
                )
                .await?;
            bubbles
        };

        if interaction.constitution_recommendation.is_none() {
            let verdict = self.safety.evaluate(&bubbles);
            let recommendation = verdict.recommendation.unwrap_or(Recommendation::Review);
            self.repo.record_safety(id, verdict.risk, &verdict.flags, recommendation).await?;
            info!(id, risk = verdict.risk, ?recommendation, "safety evaluation complete");
        }

        let refreshed = self.repo.get(id).await?;
        self.review.enqueue(&refreshed).await?;
        Ok(())
    }
}
