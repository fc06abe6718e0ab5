use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("interaction not found: {id}")]
    NotFound { id: String },

    #[error("review {id} was modified concurrently")]
    StaleReview { id: String },
}

impl DbError {
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Sql(_) => "DATABASE_ERROR",
            DbError::Migrate(_) => "MIGRATION_ERROR",
            DbError::NotFound { .. } => "NOT_FOUND",
            DbError::StaleReview { .. } => "STALE_REVIEW",
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
