use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Pipeline constants that are not meant to be tuned per-deployment.
pub const MIN_STABLE_PREFIX_TOKENS: usize = 1024;
pub const DEFAULT_BUBBLE_SEPARATOR: &str = "[GLOBO]";
pub const CONVERSATION_HISTORY_TTL_SECS: u64 = 7 * 24 * 3600;
pub const TYPING_STATE_TTL_SECS: u64 = 30;

/// Top-level config (nadia.toml + NADIA_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NadiaConfig {
    pub kv: KvConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    pub dashboard: DashboardConfig,
}

/// Governs the WAL-replay sweep (C12): how often it re-runs and how many
/// times it will retry a given interaction before giving up on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_recovery_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_recovery_max_attempts")]
    pub max_attempts: i32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { interval_secs: default_recovery_interval_secs(), max_attempts: default_recovery_max_attempts() }
    }
}

fn default_recovery_interval_secs() -> u64 {
    300
}
fn default_recovery_max_attempts() -> i32 {
    5
}

/// Command patterns the cognitive router (C5) treats as fast-path. Kept as
/// config rather than a hard-coded constant so a deployment can add its own
/// commands without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "crate::router::default_fast_patterns")]
    pub fast_patterns: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { fast_patterns: crate::router::default_fast_patterns() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub persona_path: String,
    /// Provider id used for the creative first pass (LLM-1).
    pub draft_provider: String,
    /// Provider id used for the refinement pass (LLM-2).
    pub refine_provider: String,
    /// Named provider credentials/endpoints, keyed by the ids referenced
    /// above. Mirrors skynet-core's openai_compat registry idiom but keeps
    /// it generic rather than hard-coding a fixed provider list.
    pub providers: HashMap<String, ProviderEntry>,
    #[serde(default = "default_bubble_separator")]
    pub bubble_separator: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub warm_up_on_boot: bool,
}

fn default_bubble_separator() -> String {
    DEFAULT_BUBBLE_SEPARATOR.to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_window_delay")]
    pub window_delay_secs: f64,
    #[serde(default = "default_debounce_delay")]
    pub debounce_delay_secs: f64,
    #[serde(default = "default_max_batch_wait")]
    pub max_batch_wait_secs: f64,
    #[serde(default = "default_min_batch")]
    pub min_batch_size: usize,
    #[serde(default = "default_max_batch")]
    pub max_batch_size: usize,
    #[serde(default = "default_typing_poll")]
    pub typing_poll_interval_secs: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_delay_secs: default_window_delay(),
            debounce_delay_secs: default_debounce_delay(),
            max_batch_wait_secs: default_max_batch_wait(),
            min_batch_size: default_min_batch(),
            max_batch_size: default_max_batch(),
            typing_poll_interval_secs: default_typing_poll(),
        }
    }
}

fn default_window_delay() -> f64 {
    1.5
}
fn default_debounce_delay() -> f64 {
    3.0
}
fn default_max_batch_wait() -> f64 {
    15.0
}
fn default_min_batch() -> usize {
    2
}
fn default_max_batch() -> usize {
    5
}
fn default_typing_poll() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_identity_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_identity_warm_up_limit")]
    pub warm_up_limit: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_identity_cache_capacity(),
            max_retries: default_identity_max_retries(),
            warm_up_limit: default_identity_warm_up_limit(),
        }
    }
}

fn default_identity_cache_capacity() -> usize {
    5000
}
fn default_identity_max_retries() -> u32 {
    3
}
fn default_identity_warm_up_limit() -> usize {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    #[serde(default = "bool_true")]
    pub enable_typing_pacing: bool,
    #[serde(default = "default_words_per_minute")]
    pub reading_words_per_minute: f64,
    #[serde(default = "default_typing_words_per_minute")]
    pub typing_words_per_minute: f64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            enable_typing_pacing: true,
            reading_words_per_minute: default_words_per_minute(),
            typing_words_per_minute: default_typing_words_per_minute(),
        }
    }
}

fn default_words_per_minute() -> f64 {
    250.0
}
fn default_typing_words_per_minute() -> f64 {
    60.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,
    /// Priority gained per second of wait, so an old low-risk item eventually
    /// outranks a fresh high-risk one instead of starving in the queue.
    #[serde(default = "default_aging_rate")]
    pub aging_rate: f64,
    #[serde(default = "default_review_high_water_mark")]
    pub queue_high_water_mark: usize,
    #[serde(default = "default_outbound_high_water_mark")]
    pub outbound_high_water_mark: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            risk_weight: default_risk_weight(),
            aging_rate: default_aging_rate(),
            queue_high_water_mark: default_review_high_water_mark(),
            outbound_high_water_mark: default_outbound_high_water_mark(),
        }
    }
}

fn default_risk_weight() -> f64 {
    100.0
}
fn default_aging_rate() -> f64 {
    0.01
}
fn default_review_high_water_mark() -> usize {
    500
}
fn default_outbound_high_water_mark() -> usize {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default = "default_dashboard_bind")]
    pub bind: String,
    pub api_key: String,
}

fn bool_true() -> bool {
    true
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_database_url() -> String {
    "postgres://localhost/nadia".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_dashboard_port() -> u16 {
    8000
}
fn default_dashboard_bind() -> String {
    "127.0.0.1".to_string()
}

impl NadiaConfig {
    /// Load config from a TOML file with NADIA_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ./nadia.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("nadia.toml");

        let config: NadiaConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("NADIA_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}
