use async_trait::async_trait;

use crate::schema::EnrichmentModelResponse;

/// Hints conveyed to the model, extracted from the raw posting.
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    pub title_hint: Option<String>,
    pub company_hint: Option<String>,
    pub description: String,
    pub raw_payload: serde_json::Value,
}

/// Distinguishes transient failures (retried with back-off) from schema
/// violations (not retried within the same batch).
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentCallError {
    #[error("transient enrichment provider error: {0}")]
    Transient(String),
    #[error("enrichment response failed schema validation: {0}")]
    SchemaViolation(String),
}

#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn enrich(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<EnrichmentModelResponse, EnrichmentCallError>;
}
