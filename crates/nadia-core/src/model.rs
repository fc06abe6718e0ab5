use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, InteractionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Sent,
    Failed,
}

impl ReviewStatus {
    /// True if `self -> next` is an allowed transition per the status DAG:
    /// pending -> {approved, rejected, failed}, approved -> {sent, failed}.
    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Failed) |
            (Approved, Sent) | (Approved, Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub risk: f64,
    pub flags: Vec<String>,
    pub recommendation: Option<Recommendation>,
}

/// One turn through the pipeline, mirrored by a single row in `interactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub message_number: i64,

    pub user_message: String,
    pub user_message_timestamp: DateTime<Utc>,

    pub llm1_raw_response: Option<String>,
    pub llm2_bubbles: Vec<String>,
    pub final_bubbles: Vec<String>,
    pub edit_tags: Vec<String>,
    pub reviewer_notes: Option<String>,
    pub quality_score: Option<i32>,
    pub review_time_seconds: Option<f64>,

    pub constitution_risk_score: Option<f64>,
    pub constitution_flags: Vec<String>,
    pub constitution_recommendation: Option<Recommendation>,

    pub llm1_model: Option<String>,
    pub llm2_model: Option<String>,
    pub llm1_tokens_used: Option<i64>,
    pub llm2_tokens_used: Option<i64>,
    pub llm1_cost_usd: Option<f64>,
    pub llm2_cost_usd: Option<f64>,
    pub total_cost_usd: Option<f64>,

    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub review_completed_at: Option<DateTime<Utc>>,
    pub messages_sent_at: Option<DateTime<Utc>>,

    pub cta_data: Option<serde_json::Value>,
    pub customer_status: Option<String>,

    /// How many times the recovery sweep (C12) has retried this row after
    /// finding it stranded mid-pipeline.
    pub recovery_attempts: i32,
    /// How many of `final_bubbles`, in order, the paced sender has already
    /// delivered. Redelivery after a mid-batch failure resumes here instead
    /// of resending bubbles the user already received.
    pub bubbles_sent: i32,
}

impl Interaction {
    pub fn new(
        user_id: UserId,
        conversation_id: ConversationId,
        message_number: i64,
        user_message: String,
    ) -> Self {
        Self {
            id: InteractionId::new(),
            user_id,
            conversation_id,
            message_number,
            user_message,
            user_message_timestamp: Utc::now(),
            llm1_raw_response: None,
            llm2_bubbles: Vec::new(),
            final_bubbles: Vec::new(),
            edit_tags: Vec::new(),
            reviewer_notes: None,
            quality_score: None,
            review_time_seconds: None,
            constitution_risk_score: None,
            constitution_flags: Vec::new(),
            constitution_recommendation: None,
            llm1_model: None,
            llm2_model: None,
            llm1_tokens_used: None,
            llm2_tokens_used: None,
            llm1_cost_usd: None,
            llm2_cost_usd: None,
            total_cost_usd: None,
            review_status: ReviewStatus::Pending,
            created_at: Utc::now(),
            review_completed_at: None,
            messages_sent_at: None,
            cta_data: None,
            customer_status: None,
            recovery_attempts: 0,
            bubbles_sent: 0,
        }
    }
}

/// One turn of conversation history, mirrored in `user:<uid>:history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_dag_allows_forward_transitions_only() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Rejected));
        assert!(ReviewStatus::Approved.can_transition_to(ReviewStatus::Sent));
        assert!(!ReviewStatus::Sent.can_transition_to(ReviewStatus::Pending));
        assert!(!ReviewStatus::Rejected.can_transition_to(ReviewStatus::Approved));
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Sent));
    }
}
