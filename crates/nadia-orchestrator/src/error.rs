use nadia_llm::ProviderError;
use nadia_store_db::DbError;
use nadia_store_kv::KvError;
use nadia_llm::prefix::PrefixError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("kv error: {0}")]
    Kv(#[from] KvError),

    #[error("llm provider error: {0}")]
    Llm(#[from] ProviderError),

    #[error("review queue error: {0}")]
    Review(#[from] nadia_review::ReviewError),

    #[error("persona prefix error: {0}")]
    Prefix(#[from] PrefixError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
