use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const EMBEDDING_DIM: usize = 1536;
pub const DEFAULT_DAILY_CAP: u32 = 10;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_RULE_THRESHOLD: f64 = 39.0;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.65;
pub const DEFAULT_MATCH_TOP_L: usize = 25;
pub const DEFAULT_INGESTION_BATCH: usize = 50;

/// Top-level config (jobsignal.toml + JOBSIGNAL_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSignalConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for JobSignalConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            chat: ChatConfig::default(),
            enrichment: EnrichmentConfig::default(),
            embedding: EmbeddingConfig::default(),
            matching: MatchingConfig::default(),
            delivery: DeliveryConfig::default(),
            window: WindowConfig::default(),
            scheduler: SchedulerConfig::default(),
            metrics: MetricsConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl JobSignalConfig {
    /// Load config from a TOML file with JOBSIGNAL_* env var overrides.
    ///
    /// Checks in order: explicit path argument, then `./jobsignal.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("jobsignal.toml").to_string();

        let config: JobSignalConfig = Figment::from(figment::providers::Serialized::defaults(
            JobSignalConfig::default(),
        ))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("JOBSIGNAL_").split("_"))
        .extract()
        .map_err(|e| crate::error::JobSignalError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./jobsignal.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    /// Shared secret used to verify X-Hub-Signature-256 on inbound webhooks.
    pub app_secret: Option<String>,
    /// Token compared against `hub.verify_token` on the GET verification handshake.
    pub verify_token: Option<String>,
    /// Bearer token used to authenticate outbound sends against the provider.
    pub access_token: Option<String>,
    #[serde(default = "default_chat_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            app_secret: None,
            verify_token: None,
            access_token: None,
            send_timeout_ms: default_chat_send_timeout_ms(),
        }
    }
}

fn default_chat_base_url() -> String {
    "https://graph.example-chat-provider.com/v20.0".to_string()
}
fn default_chat_send_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_enrichment_base_url")]
    pub base_url: String,
    #[serde(default = "default_enrichment_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_enrichment_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_enrichment_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fallback currency applied when the model omits `ai_salary_currency`.
    #[serde(default = "default_fallback_currency")]
    pub fallback_currency: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_enrichment_base_url(),
            model: default_enrichment_model(),
            batch_size: default_batch_size(),
            concurrency: default_enrichment_concurrency(),
            timeout_ms: default_enrichment_timeout_ms(),
            max_attempts: default_max_attempts(),
            fallback_currency: default_fallback_currency(),
        }
    }
}

fn default_enrichment_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_enrichment_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_INGESTION_BATCH
}
fn default_enrichment_concurrency() -> usize {
    2
}
fn default_enrichment_timeout_ms() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_fallback_currency() -> String {
    "NGN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,
    /// Embedding format/version tag stamped on every vector written.
    #[serde(default = "default_embedding_version")]
    pub version: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            timeout_ms: default_embedding_timeout_ms(),
            cache_entries: default_cache_entries(),
            version: default_embedding_version(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_embedding_timeout_ms() -> u64 {
    10_000
}
fn default_cache_entries() -> usize {
    4096
}
fn default_embedding_version() -> String {
    "v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_rule_threshold")]
    pub rule_threshold: f64,
    #[serde(default = "default_top_l")]
    pub top_l: usize,
    /// Recency window in days for candidate canonical postings.
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            rule_threshold: default_rule_threshold(),
            top_l: default_top_l(),
            recency_days: default_recency_days(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_rule_threshold() -> f64 {
    DEFAULT_RULE_THRESHOLD
}
fn default_top_l() -> usize {
    DEFAULT_MATCH_TOP_L
}
fn default_recency_days() -> i64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            daily_cap: default_daily_cap(),
        }
    }
}

fn default_daily_cap() -> u32 {
    DEFAULT_DAILY_CAP
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_hours")]
    pub duration_hours: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration_hours: default_window_hours(),
        }
    }
}

fn default_window_hours() -> i64 {
    DEFAULT_WINDOW_HOURS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_reminder_cadence_secs")]
    pub reminder_daemon_cadence_secs: u64,
    #[serde(default = "default_enrichment_cadence_secs")]
    pub enrichment_cadence_secs: u64,
    #[serde(default = "default_embedding_backfill_cadence_secs")]
    pub embedding_backfill_cadence_secs: u64,
    #[serde(default = "default_stale_embedding_cadence_secs")]
    pub stale_embedding_refresh_cadence_secs: u64,
    #[serde(default = "default_dedup_purge_cadence_secs")]
    pub dedup_purge_cadence_secs: u64,
    #[serde(default = "default_old_record_purge_cadence_secs")]
    pub old_record_purge_cadence_secs: u64,
    #[serde(default = "default_stale_embedding_days")]
    pub stale_embedding_days: i64,
    #[serde(default = "default_old_record_days")]
    pub old_record_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reminder_daemon_cadence_secs: default_reminder_cadence_secs(),
            enrichment_cadence_secs: default_enrichment_cadence_secs(),
            embedding_backfill_cadence_secs: default_embedding_backfill_cadence_secs(),
            stale_embedding_refresh_cadence_secs: default_stale_embedding_cadence_secs(),
            dedup_purge_cadence_secs: default_dedup_purge_cadence_secs(),
            old_record_purge_cadence_secs: default_old_record_purge_cadence_secs(),
            stale_embedding_days: default_stale_embedding_days(),
            old_record_days: default_old_record_days(),
        }
    }
}

fn default_reminder_cadence_secs() -> u64 {
    5 * 60
}
fn default_enrichment_cadence_secs() -> u64 {
    2 * 60 * 60
}
fn default_embedding_backfill_cadence_secs() -> u64 {
    20 * 60
}
fn default_stale_embedding_cadence_secs() -> u64 {
    24 * 60 * 60
}
fn default_dedup_purge_cadence_secs() -> u64 {
    5 * 60 * 60
}
fn default_old_record_purge_cadence_secs() -> u64 {
    6 * 60 * 60
}
fn default_stale_embedding_days() -> i64 {
    30
}
fn default_old_record_days() -> i64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_gateway_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Bearer token required on GET /metrics. None disables auth (dev only).
    pub token: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: None,
        }
    }
}
