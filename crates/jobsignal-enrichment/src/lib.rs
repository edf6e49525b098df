pub mod anthropic;
pub mod provider;
pub mod schema;
pub mod worker;

pub use anthropic::AnthropicEnrichmentProvider;
pub use provider::{EnrichmentCallError, EnrichmentProvider, EnrichmentRequest};
pub use schema::EnrichmentModelResponse;
pub use worker::{EnrichmentBatchOutcome, EnrichmentWorker};
