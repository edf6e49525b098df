use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobSignalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Chat provider error: {0}")]
    ChatProvider(String),

    #[error("Enrichment provider error: {0}")]
    EnrichmentProvider(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobSignalError {
    /// Short error code string surfaced on health/metrics endpoints.
    pub fn code(&self) -> &'static str {
        match self {
            JobSignalError::Config(_) => "CONFIG_ERROR",
            JobSignalError::Database(_) => "DATABASE_ERROR",
            JobSignalError::ChatProvider(_) => "CHAT_PROVIDER_ERROR",
            JobSignalError::EnrichmentProvider(_) => "ENRICHMENT_PROVIDER_ERROR",
            JobSignalError::EmbeddingProvider(_) => "EMBEDDING_PROVIDER_ERROR",
            JobSignalError::SchemaViolation(_) => "SCHEMA_VIOLATION",
            JobSignalError::NotFound(_) => "NOT_FOUND",
            JobSignalError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            JobSignalError::Serialization(_) => "SERIALIZATION_ERROR",
            JobSignalError::Timeout { .. } => "TIMEOUT",
            JobSignalError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<rusqlite::Error> for JobSignalError {
    fn from(e: rusqlite::Error) -> Self {
        JobSignalError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JobSignalError>;
