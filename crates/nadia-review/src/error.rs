use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("database error: {0}")]
    Db(#[from] nadia_store_db::DbError),

    #[error("key-value store error: {0}")]
    Kv(#[from] nadia_store_kv::KvError),
}

impl ReviewError {
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::Db(nadia_store_db::DbError::StaleReview { .. }) => "STALE_REVIEW",
            ReviewError::Db(nadia_store_db::DbError::NotFound { .. }) => "NOT_FOUND",
            ReviewError::Db(_) => "DATABASE_ERROR",
            ReviewError::Kv(_) => "KV_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
