use nadia_core::model::{Interaction, Recommendation, ReviewStatus};
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::error::{DbError, Result};

/// Whether `InteractionRepository::approve` performed a fresh state
/// transition or matched an already-applied, identical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveOutcome {
    Applied,
    AlreadyApplied,
}

/// Thin async repository over the `interactions` and `user_cursors` tables.
///
/// Holds a pool rather than a single connection — unlike the teacher's
/// single-Mutex-Connection managers, every call here can run concurrently.
pub struct InteractionRepository {
    pool: PgPool,
}

impl InteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, interaction), fields(id = %interaction.id))]
    pub async fn insert(&self, interaction: &Interaction) -> Result<()> {
        sqlx::query(
            "INSERT INTO interactions
             (id, user_id, conversation_id, message_number, user_message,
              user_message_timestamp, review_status, created_at, recovery_attempts, bubbles_sent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(interaction.id.as_str())
        .bind(interaction.user_id.as_str())
        .bind(interaction.conversation_id.as_str())
        .bind(interaction.message_number)
        .bind(&interaction.user_message)
        .bind(interaction.user_message_timestamp)
        .bind(status_str(interaction.review_status))
        .bind(interaction.created_at)
        .bind(interaction.recovery_attempts)
        .bind(interaction.bubbles_sent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Interaction> {
        let row = sqlx::query("SELECT * FROM interactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound { id: id.to_string() })?;
        Ok(row_to_interaction(&row))
    }

    /// Record LLM-1's draft and its cost/token metering.
    #[instrument(skip(self, raw_response))]
    pub async fn record_draft(
        &self,
        id: &str,
        raw_response: &str,
        model: &str,
        tokens_used: i64,
        cost_usd: f64,
    ) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE interactions
             SET llm1_raw_response = $1, llm1_model = $2,
                 llm1_tokens_used = $3, llm1_cost_usd = $4
             WHERE id = $5",
        )
        .bind(raw_response)
        .bind(model)
        .bind(tokens_used)
        .bind(cost_usd)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if rows == 0 {
            return Err(DbError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Record LLM-2's refined bubbles, its metering, and the total cost.
    #[instrument(skip(self, bubbles))]
    pub async fn record_refinement(
        &self,
        id: &str,
        bubbles: &[String],
        model: &str,
        tokens_used: i64,
        cost_usd: f64,
        total_cost_usd: f64,
    ) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE interactions
             SET llm2_bubbles = $1, llm2_model = $2, llm2_tokens_used = $3,
                 llm2_cost_usd = $4, total_cost_usd = $5
             WHERE id = $6",
        )
        .bind(bubbles)
        .bind(model)
        .bind(tokens_used)
        .bind(cost_usd)
        .bind(total_cost_usd)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if rows == 0 {
            return Err(DbError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    #[instrument(skip(self, flags))]
    pub async fn record_safety(
        &self,
        id: &str,
        risk: f64,
        flags: &[String],
        recommendation: Recommendation,
    ) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE interactions
             SET constitution_risk_score = $1, constitution_flags = $2,
                 constitution_recommendation = $3
             WHERE id = $4",
        )
        .bind(risk)
        .bind(flags)
        .bind(recommendation_str(recommendation))
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if rows == 0 {
            return Err(DbError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Approve a pending review, writing the reviewer's final edit.
    /// Idempotent: a second call with identical arguments returns
    /// `AlreadyApplied` rather than re-running the transition; a second call
    /// with differing arguments fails with `StaleReview`. Callers must only
    /// act on a fresh transition (`Applied`) — treating `AlreadyApplied` the
    /// same as `Applied` would re-enqueue an already-sent interaction.
    #[instrument(skip(self, final_bubbles, edit_tags, reviewer_notes))]
    pub async fn approve(
        &self,
        id: &str,
        final_bubbles: &[String],
        edit_tags: &[String],
        quality_score: Option<i32>,
        reviewer_notes: Option<&str>,
    ) -> Result<ApproveOutcome> {
        let existing = self.get(id).await?;
        if existing.review_status == ReviewStatus::Approved
            || existing.review_status == ReviewStatus::Sent
        {
            if existing.final_bubbles == final_bubbles
                && existing.edit_tags == edit_tags
                && existing.quality_score == quality_score
            {
                return Ok(ApproveOutcome::AlreadyApplied);
            }
            return Err(DbError::StaleReview { id: id.to_string() });
        }
        if existing.review_status != ReviewStatus::Pending {
            return Err(DbError::StaleReview { id: id.to_string() });
        }

        sqlx::query(
            "UPDATE interactions
             SET final_bubbles = $1, edit_tags = $2, quality_score = $3,
                 reviewer_notes = $4, review_status = 'approved',
                 review_completed_at = now()
             WHERE id = $5 AND review_status = 'pending'",
        )
        .bind(final_bubbles)
        .bind(edit_tags)
        .bind(quality_score)
        .bind(reviewer_notes)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(ApproveOutcome::Applied)
    }

    /// Patch the reviewer's draft in place without changing status. Only
    /// allowed while the row is still pending.
    #[instrument(skip(self, final_bubbles, edit_tags))]
    pub async fn edit_draft(&self, id: &str, final_bubbles: &[String], edit_tags: &[String]) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE interactions SET final_bubbles = $1, edit_tags = $2
             WHERE id = $3 AND review_status = 'pending'",
        )
        .bind(final_bubbles)
        .bind(edit_tags)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if rows == 0 {
            let existing = self.get(id).await?;
            if existing.review_status != ReviewStatus::Pending {
                return Err(DbError::StaleReview { id: id.to_string() });
            }
        }
        Ok(())
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(&self, id: &str, reason: &str) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE interactions
             SET review_status = 'rejected', reviewer_notes = $1,
                 review_completed_at = now()
             WHERE id = $2 AND review_status = 'pending'",
        )
        .bind(reason)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if rows == 0 {
            let existing = self.get(id).await?;
            if existing.review_status == ReviewStatus::Rejected {
                return Ok(());
            }
            return Err(DbError::StaleReview { id: id.to_string() });
        }
        Ok(())
    }

    /// Advance the sent-bubble cursor by one, called after each bubble the
    /// paced sender successfully delivers so a mid-batch failure resumes
    /// instead of replaying bubbles already seen by the user.
    #[instrument(skip(self))]
    pub async fn bump_bubbles_sent(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE interactions SET bubbles_sent = bubbles_sent + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_sent(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE interactions SET review_status = 'sent', messages_sent_at = now()
             WHERE id = $1 AND review_status = 'approved'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, reason))]
    pub async fn mark_failed(&self, id: &str, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE interactions SET review_status = 'failed', reviewer_notes = $1
             WHERE id = $2",
        )
        .bind(reason)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record another failed recovery pass and return the new attempt count,
    /// so the caller can compare it against the configured bound.
    #[instrument(skip(self))]
    pub async fn bump_recovery_attempts(&self, id: &str) -> Result<i32> {
        let row = sqlx::query(
            "UPDATE interactions SET recovery_attempts = recovery_attempts + 1
             WHERE id = $1 RETURNING recovery_attempts",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i32, _>("recovery_attempts"))
    }

    #[instrument(skip(self))]
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            "SELECT * FROM interactions WHERE review_status = 'pending'
             ORDER BY constitution_risk_score DESC NULLS LAST, created_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_interaction).collect())
    }

    #[instrument(skip(self))]
    pub async fn last_message_number(&self, conversation_id: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(message_number), -1) AS n
             FROM interactions WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n"))
    }

    /// Distinct users with the most recently created interaction, most
    /// recent first. Feeds entity-resolver cache warm-up on boot.
    #[instrument(skip(self))]
    pub async fn recent_user_ids(&self, limit: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT user_id, MAX(created_at) AS last_seen FROM interactions
             GROUP BY user_id ORDER BY last_seen DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>("user_id")).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_cursor(&self, user_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT last_message_id FROM user_cursors WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("last_message_id")))
    }

    #[instrument(skip(self))]
    pub async fn set_cursor(&self, user_id: &str, last_message_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_cursors (user_id, last_message_id) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET last_message_id = EXCLUDED.last_message_id",
        )
        .bind(user_id)
        .bind(last_message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn status_str(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => "pending",
        ReviewStatus::Approved => "approved",
        ReviewStatus::Rejected => "rejected",
        ReviewStatus::Sent => "sent",
        ReviewStatus::Failed => "failed",
    }
}

fn recommendation_str(rec: Recommendation) -> &'static str {
    match rec {
        Recommendation::Approve => "approve",
        Recommendation::Review => "review",
        Recommendation::Reject => "reject",
    }
}

fn parse_status(s: &str) -> ReviewStatus {
    match s {
        "approved" => ReviewStatus::Approved,
        "rejected" => ReviewStatus::Rejected,
        "sent" => ReviewStatus::Sent,
        "failed" => ReviewStatus::Failed,
        _ => ReviewStatus::Pending,
    }
}

fn parse_recommendation(s: Option<&str>) -> Option<Recommendation> {
    match s {
        Some("approve") => Some(Recommendation::Approve),
        Some("review") => Some(Recommendation::Review),
        Some("reject") => Some(Recommendation::Reject),
        _ => None,
    }
}

fn row_to_interaction(row: &sqlx::postgres::PgRow) -> Interaction {
    Interaction {
        id: row.get::<String, _>("id").into(),
        user_id: row.get::<String, _>("user_id").into(),
        conversation_id: nadia_core::ConversationId(row.get::<String, _>("conversation_id")),
        message_number: row.get("message_number"),
        user_message: row.get("user_message"),
        user_message_timestamp: row.get("user_message_timestamp"),
        llm1_raw_response: row.get("llm1_raw_response"),
        llm2_bubbles: row.get::<Vec<String>, _>("llm2_bubbles"),
        final_bubbles: row.get::<Vec<String>, _>("final_bubbles"),
        edit_tags: row.get::<Vec<String>, _>("edit_tags"),
        reviewer_notes: row.get("reviewer_notes"),
        quality_score: row.get("quality_score"),
        review_time_seconds: row.get("review_time_seconds"),
        constitution_risk_score: row.get("constitution_risk_score"),
        constitution_flags: row.get::<Vec<String>, _>("constitution_flags"),
        constitution_recommendation: parse_recommendation(
            row.get::<Option<String>, _>("constitution_recommendation").as_deref(),
        ),
        llm1_model: row.get("llm1_model"),
        llm2_model: row.get("llm2_model"),
        llm1_tokens_used: row.get("llm1_tokens_used"),
        llm2_tokens_used: row.get("llm2_tokens_used"),
        llm1_cost_usd: row.get("llm1_cost_usd"),
        llm2_cost_usd: row.get("llm2_cost_usd"),
        total_cost_usd: row.get("total_cost_usd"),
        review_status: parse_status(row.get::<String, _>("review_status").as_str()),
        created_at: row.get("created_at"),
        review_completed_at: row.get("review_completed_at"),
        messages_sent_at: row.get("messages_sent_at"),
        cta_data: row.get("cta_data"),
        customer_status: row.get("customer_status"),
        recovery_attempts: row.get("recovery_attempts"),
        bubbles_sent: row.get("bubbles_sent"),
    }
}
