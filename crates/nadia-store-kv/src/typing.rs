use nadia_core::config::TYPING_STATE_TTL_SECS;
use nadia_core::UserId;

use crate::client::KvStore;
use crate::error::Result;
use crate::keys::TYPING_STATE;

/// Per-user typing-state hash. Each field carries its own freshness via a
/// value written alongside a process-level hash TTL refresh on every set,
/// since Redis has no per-field HEXPIRE on the command set this pipeline
/// targets; absence of a recent write is treated as not-typing (see `is_typing`).
pub struct TypingStateStore {
    kv: KvStore,
}

impl TypingStateStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub async fn set_typing(&self, user_id: &UserId, typing: bool) -> Result<()> {
        let stamped = format!("{}:{}", typing, chrono::Utc::now().timestamp());
        self.kv.hset(TYPING_STATE, user_id.as_str(), &stamped).await?;
        self.kv.expire(TYPING_STATE, TYPING_STATE_TTL_SECS as i64).await
    }

    /// Returns whether the user is currently typing, treating a stale or
    /// missing entry (older than the freshness TTL) as not-typing.
    pub async fn is_typing(&self, user_id: &UserId) -> Result<bool> {
        let raw = match self.kv.hget(TYPING_STATE, user_id.as_str()).await? {
            Some(v) => v,
            None => return Ok(false),
        };
        let Some((flag, stamp)) = raw.split_once(':') else {
            return Ok(false);
        };
        let Ok(stamp) = stamp.parse::<i64>() else {
            return Ok(false);
        };
        let age = chrono::Utc::now().timestamp() - stamp;
        if age > TYPING_STATE_TTL_SECS as i64 {
            return Ok(false);
        }
        Ok(flag == "true")
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn stale_marker_parses_flag_and_age() {
        let raw = "true:1000";
        let (flag, stamp) = raw.split_once(':').unwrap();
        assert_eq!(flag, "true");
        assert_eq!(stamp.parse::<i64>().unwrap(), 1000);
    }
}
