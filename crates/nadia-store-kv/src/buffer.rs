use nadia_core::UserId;
use serde::{Deserialize, Serialize};

use crate::client::KvStore;
use crate::error::Result;
use crate::keys::MESSAGE_BUFFER;

/// One buffered inbound message, as mirrored in `nadia_message_buffer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedMessage {
    pub text: String,
    pub arrived_at: chrono::DateTime<chrono::Utc>,
}

/// Write-through mirror of the activity tracker's per-user buffer. The
/// tracker keeps the authoritative in-memory copy; this lets a restart
/// recover buffers the process lost mid-window.
pub struct BufferStore {
    kv: KvStore,
}

impl BufferStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub async fn save(&self, user_id: &UserId, messages: &[BufferedMessage]) -> Result<()> {
        let encoded = serde_json::to_string(messages)?;
        self.kv.hset(MESSAGE_BUFFER, user_id.as_str(), &encoded).await
    }

    pub async fn load(&self, user_id: &UserId) -> Result<Vec<BufferedMessage>> {
        match self.kv.hget(MESSAGE_BUFFER, user_id.as_str()).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn clear(&self, user_id: &UserId) -> Result<()> {
        self.kv.hdel(MESSAGE_BUFFER, user_id.as_str()).await
    }

    /// All user ids with a non-empty buffer, used by the recovery agent on boot.
    pub async fn buffered_user_ids(&self) -> Result<Vec<String>> {
        self.kv.hkeys(MESSAGE_BUFFER).await
    }
}
