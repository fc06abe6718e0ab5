use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("redis connection error: {0}")]
    Connection(String),

    #[error("redis command error: {0}")]
    Command(#[from] redis::RedisError),

    #[error("deserialization error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl KvError {
    pub fn code(&self) -> &'static str {
        match self {
            KvError::Connection(_) => "KV_CONNECTION",
            KvError::Command(_) => "KV_COMMAND",
            KvError::Decode(_) => "KV_DECODE",
        }
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
