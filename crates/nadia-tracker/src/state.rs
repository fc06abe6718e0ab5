use chrono::{DateTime, Utc};

/// One inbound message waiting in a user's adaptive window, kept in memory
/// for fast access; [`nadia_store_kv::BufferStore`] mirrors the same data to
/// Redis so a restart can recover a window a crash interrupted.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub text: String,
    pub arrived_at: DateTime<Utc>,
}

impl From<&PendingMessage> for nadia_store_kv::BufferedMessage {
    fn from(m: &PendingMessage) -> Self {
        nadia_store_kv::BufferedMessage { text: m.text.clone(), arrived_at: m.arrived_at }
    }
}

impl From<nadia_store_kv::BufferedMessage> for PendingMessage {
    fn from(m: nadia_store_kv::BufferedMessage) -> Self {
        PendingMessage { text: m.text, arrived_at: m.arrived_at }
    }
}

/// A window's outcome, handed to the dispatch channel once the buffer closes.
#[derive(Debug, Clone)]
pub struct FlushedBatch {
    pub user_id: nadia_core::UserId,
    pub messages: Vec<PendingMessage>,
}

impl FlushedBatch {
    /// Percentage of LLM calls saved versus processing each message alone,
    /// mirroring the `PACING_METRICS` log line the window manager emits.
    pub fn estimated_savings_pct(&self) -> f64 {
        let n = self.messages.len();
        if n <= 1 {
            0.0
        } else {
            ((n - 1) as f64 / n as f64) * 100.0
        }
    }

    /// A single combined message body, each fragment on its own line, for
    /// callers that want one LLM turn per batch rather than per message.
    pub fn combined_text(&self) -> String {
        self.messages.iter().map(|m| m.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}
