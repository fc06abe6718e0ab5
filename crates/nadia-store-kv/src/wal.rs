use serde::{Deserialize, Serialize};

use crate::client::KvStore;
use crate::error::Result;
use crate::keys::{OUTBOUND_QUEUE, WAL_QUEUE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub interaction_id: String,
    pub user_id: String,
    pub payload: serde_json::Value,
}

/// Durable write-ahead list: every inbound batch is pushed here before the
/// relational row exists, and removed only once that row is durably written.
pub struct WalQueue {
    kv: KvStore,
}

impl WalQueue {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub async fn push(&self, entry: &WalEntry) -> Result<()> {
        let encoded = serde_json::to_string(entry)?;
        self.kv.lpush(WAL_QUEUE, &encoded).await
    }

    pub async fn remove(&self, entry: &WalEntry) -> Result<()> {
        let encoded = serde_json::to_string(entry)?;
        self.kv.lrem(WAL_QUEUE, 1, &encoded).await
    }

    /// All entries currently queued, oldest first, used by the recovery agent.
    pub async fn snapshot(&self) -> Result<Vec<WalEntry>> {
        let raw = self.kv.lrange(WAL_QUEUE, 0, -1).await?;
        raw.into_iter()
            .rev()
            .map(|s| serde_json::from_str(&s).map_err(Into::into))
            .collect()
    }

    pub async fn len(&self) -> Result<i64> {
        self.kv.llen(WAL_QUEUE).await
    }
}

/// Outbound delivery list: approved interactions awaiting paced send,
/// FIFO per conversation (the paced sender drains it in arrival order).
pub struct OutboundQueue {
    kv: KvStore,
}

impl OutboundQueue {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub async fn push(&self, interaction_id: &str) -> Result<()> {
        self.kv.lpush(OUTBOUND_QUEUE, interaction_id).await
    }

    /// Put an interaction back at the front of the queue (used when a send
    /// fails partway through, to redeliver the remaining bubbles first).
    pub async fn push_front(&self, interaction_id: &str) -> Result<()> {
        self.kv.rpush(OUTBOUND_QUEUE, interaction_id).await
    }

    pub async fn pop(&self, timeout_secs: f64) -> Result<Option<String>> {
        self.kv.brpop(OUTBOUND_QUEUE, timeout_secs).await
    }

    pub async fn len(&self) -> Result<i64> {
        self.kv.llen(OUTBOUND_QUEUE).await
    }

    pub async fn snapshot(&self) -> Result<Vec<String>> {
        let raw = self.kv.lrange(OUTBOUND_QUEUE, 0, -1).await?;
        Ok(raw.into_iter().rev().collect())
    }
}
