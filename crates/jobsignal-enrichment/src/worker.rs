//! Enrichment Worker: pulls unprocessed raw postings in bounded batches,
//! asks the language model to structure each one, writes a canonical
//! record plus its embedding, and marks the raw row processed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tracing::{debug, error, info, warn};

use jobsignal_core::config::EnrichmentConfig;
use jobsignal_core::events::DeliveryTrigger;
use jobsignal_core::types::{
    CanonicalPostingId, Currency, Embedding, EmploymentType, ExperienceLevel, RawPostingId,
    SalaryPeriod, SalaryRange, WorkArrangement, YearsRange,
};
use jobsignal_core::Clock;
use jobsignal_embeddings::profile_text::job_profile_text;
use jobsignal_embeddings::EmbeddingProvider;
use jobsignal_store::entities::{CanonicalPosting, RawPosting};
use jobsignal_store::Store;

use crate::provider::{EnrichmentCallError, EnrichmentProvider, EnrichmentRequest};
use crate::schema::{validate, EnrichmentModelResponse};

#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichmentBatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct EnrichmentWorker {
    store: Arc<Store>,
    enrichment: Arc<dyn EnrichmentProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    delivery: Arc<dyn DeliveryTrigger>,
    clock: Arc<dyn Clock>,
    config: EnrichmentConfig,
}

impl EnrichmentWorker {
    pub fn new(
        store: Arc<Store>,
        enrichment: Arc<dyn EnrichmentProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        delivery: Arc<dyn DeliveryTrigger>,
        clock: Arc<dyn Clock>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            store,
            enrichment,
            embedder,
            delivery,
            clock,
            config,
        }
    }

    /// Runs one pass: up to `batch_size` unprocessed raw postings,
    /// `scraped_at` ascending. Never blocks the batch on a single record's
    /// failure.
    pub async fn run_once(&self) -> jobsignal_core::Result<EnrichmentBatchOutcome> {
        let batch = self.store.raw_postings.pull_unprocessed_batch(self.config.batch_size)?;
        let mut outcome = EnrichmentBatchOutcome {
            attempted: batch.len(),
            ..Default::default()
        };

        for raw in batch {
            match self.process_one(&raw).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!(raw_id = %raw.id, error = %e, "enrichment failed for record");
                    let _ = self.store.raw_postings.mark_failed(raw.id, &e.to_string());
                }
            }
        }

        info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "enrichment batch complete"
        );
        Ok(outcome)
    }

    async fn process_one(&self, raw: &RawPosting) -> jobsignal_core::Result<()> {
        let request = build_request(raw);
        let response = self.call_with_retry(raw.id, &request).await?;
        let arrangement = validate(&response).map_err(|e| {
            jobsignal_core::JobSignalError::SchemaViolation(e.to_string())
        })?;

        let posting = compose_canonical(raw, &response, arrangement, &self.config.fallback_currency);
        let posting_id = posting.id;
        self.store.canonical_postings.insert(&posting)?;
        debug!(raw_id = %raw.id, canonical_id = %posting_id, "canonical posting inserted");

        let source_text = job_profile_text(&posting);
        let vector = self.embedder.embed(&source_text).await?;
        let embedding = Embedding {
            vector,
            source_text,
            version: self.embedder.version().to_string(),
            generated_at: self.clock.now(),
        };
        self.store.canonical_postings.attach_embedding(posting_id, &embedding)?;

        self.store.raw_postings.mark_processed(raw.id)?;

        if let Err(e) = self.delivery.on_canonical_posting_ready(posting_id).await {
            warn!(canonical_id = %posting_id, error = %e, "delivery trigger failed after enrichment");
        }

        Ok(())
    }

    /// Exponential back-off up to `max_attempts` for transient errors;
    /// schema violations fail immediately without retry.
    async fn call_with_retry(
        &self,
        raw_id: RawPostingId,
        request: &EnrichmentRequest,
    ) -> jobsignal_core::Result<EnrichmentModelResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.enrichment.enrich(request).await {
                Ok(resp) => return Ok(resp),
                Err(EnrichmentCallError::SchemaViolation(msg)) => {
                    return Err(jobsignal_core::JobSignalError::SchemaViolation(msg));
                }
                Err(EnrichmentCallError::Transient(msg)) => {
                    if attempt >= self.config.max_attempts {
                        error!(raw_id = %raw_id, attempt, "enrichment exhausted retries");
                        return Err(jobsignal_core::JobSignalError::EnrichmentProvider(msg));
                    }
                    let backoff_ms = 200u64 * 2u64.pow(attempt - 1);
                    warn!(raw_id = %raw_id, attempt, backoff_ms, "transient enrichment error, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

fn build_request(raw: &RawPosting) -> EnrichmentRequest {
    let title_hint = raw
        .payload
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let company_hint = raw
        .payload
        .get("company")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let description = raw
        .payload
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    EnrichmentRequest {
        title_hint,
        company_hint,
        description,
        raw_payload: raw.payload.clone(),
    }
}

/// Parses a "City, State, Country" style display location into a triple, for
/// the fallback path when the model omits one.
fn parse_display_location(display: &str) -> (Option<String>, Option<String>, Option<String>) {
    let parts: Vec<&str> = display.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    match parts.len() {
        0 => (None, None, None),
        1 => (Some(parts[0].to_string()), None, None),
        2 => (Some(parts[0].to_string()), None, Some(parts[1].to_string())),
        _ => (
            Some(parts[0].to_string()),
            Some(parts[1].to_string()),
            Some(parts[parts.len() - 1].to_string()),
        ),
    }
}

/// Direct employment type, read verbatim from the scrape payload when the
/// source provided one. Unlike `work_arrangement` there's no model-inferred
/// fallback — a posting with no recognizable value simply has `None` here.
fn parse_direct_employment_type(raw: &RawPosting) -> Option<EmploymentType> {
    raw.payload
        .get("employment_type")
        .and_then(|v| v.as_str())
        .and_then(EmploymentType::parse)
}

/// Direct salary range, read verbatim from the scrape payload's
/// `salary_min`/`salary_max`/`salary_currency`/`salary_period` fields (when
/// present) rather than the model-inferred `inferred_salary_range`.
fn parse_direct_salary_range(raw: &RawPosting, fallback_currency: &str) -> Option<SalaryRange> {
    let min = raw.payload.get("salary_min").and_then(|v| v.as_i64());
    let max = raw.payload.get("salary_max").and_then(|v| v.as_i64());
    if min.is_none() && max.is_none() {
        return None;
    }
    let currency = raw
        .payload
        .get("salary_currency")
        .and_then(|v| v.as_str())
        .and_then(Currency::parse)
        .unwrap_or_else(|| Currency::parse(fallback_currency).unwrap_or(Currency::Ngn));
    let period = raw
        .payload
        .get("salary_period")
        .and_then(|v| v.as_str())
        .and_then(SalaryPeriod::parse)
        .unwrap_or(SalaryPeriod::Monthly);
    Some(SalaryRange { min, max, currency, period }.normalize_bounds())
}

fn compose_canonical(
    raw: &RawPosting,
    resp: &EnrichmentModelResponse,
    arrangement: WorkArrangement,
    fallback_currency: &str,
) -> CanonicalPosting {
    let title = resp.ai_job_titles[0].clone();
    let alternate_titles = resp.ai_job_titles[1..].to_vec();

    let display_location = raw
        .payload
        .get("location")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let (fallback_city, fallback_state, fallback_country) = parse_display_location(&display_location);
    let city = if resp.ai_city.is_empty() { fallback_city } else { Some(resp.ai_city.clone()) };
    let state = if resp.ai_state.is_empty() { fallback_state } else { Some(resp.ai_state.clone()) };
    let country = if resp.ai_country.is_empty() { fallback_country } else { Some(resp.ai_country.clone()) };

    let inferred_currency = resp
        .ai_salary_currency
        .clone()
        .and_then(|c| Currency::parse(&c))
        .unwrap_or_else(|| Currency::parse(fallback_currency).unwrap_or(Currency::Ngn));

    let inferred_salary_range = if resp.ai_salary_min.is_some() || resp.ai_salary_max.is_some() {
        Some(
            SalaryRange {
                min: resp.ai_salary_min,
                max: resp.ai_salary_max,
                currency: inferred_currency,
                period: SalaryPeriod::Monthly,
            }
            .normalize_bounds(),
        )
    } else {
        None
    };

    let years_experience = match (resp.ai_years_experience_min, resp.ai_years_experience_max) {
        (Some(min), Some(max)) => Some(YearsRange::clamped(min.max(0) as u32, max.max(0) as u32)),
        (Some(v), None) | (None, Some(v)) => Some(YearsRange::clamped(v.max(0) as u32, v.max(0) as u32)),
        (None, None) => None,
    };

    let levels: Vec<ExperienceLevel> = resp
        .ai_job_level
        .iter()
        .filter_map(|s| ExperienceLevel::parse(s))
        .collect();

    let posted_date = raw
        .payload
        .get("posted_date")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            let naive_date = raw.scraped_at.date_naive();
            Utc.from_utc_datetime(&naive_date.and_hms_opt(0, 0, 0).unwrap())
        });

    CanonicalPosting {
        id: CanonicalPostingId::new(),
        raw_id: raw.id,
        title,
        company: raw.payload.get("company").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        display_location,
        posting_url: raw.url.clone(),
        description: raw.payload.get("description").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        employment_type: parse_direct_employment_type(raw),
        salary_range: parse_direct_salary_range(raw, fallback_currency),
        posted_date,
        source: raw.source.clone(),
        alternate_titles,
        required_skills: resp.ai_required_skills.clone(),
        preferred_skills: resp.ai_preferred_skills.clone(),
        industries: resp.ai_industry.clone(),
        job_function: Some(resp.ai_job_function.clone()),
        levels,
        city,
        state,
        country,
        work_arrangement: Some(arrangement),
        remote_allowed: resp.ai_remote_allowed,
        inferred_salary_range,
        years_experience,
        summary: Some(resp.ai_summary.clone()),
        embedding: None,
        scraped_at: raw.scraped_at,
        ai_enhanced: false,
    }
}
