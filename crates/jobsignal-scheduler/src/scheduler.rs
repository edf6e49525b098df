use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use jobsignal_core::config::SchedulerConfig;
use jobsignal_core::types::Embedding;
use jobsignal_core::Clock;
use jobsignal_dispatch::DeliveryDispatcher;
use jobsignal_embeddings::profile_text::job_profile_text;
use jobsignal_embeddings::EmbeddingProvider;
use jobsignal_enrichment::EnrichmentWorker;
use jobsignal_store::Store;

const BACKFILL_BATCH: usize = 100;
const STALE_REFRESH_BATCH: usize = 100;

/// Coarse-cadence background jobs. Each cadence runs as its own cooperative
/// loop against a shared shutdown signal; a failure in one pass is logged
/// and does not stop the loop.
pub struct Scheduler {
    store: Arc<Store>,
    enrichment: Arc<EnrichmentWorker>,
    embedder: Arc<dyn EmbeddingProvider>,
    dispatcher: Arc<DeliveryDispatcher>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        store: Arc<Store>,
        enrichment: Arc<EnrichmentWorker>,
        embedder: Arc<dyn EmbeddingProvider>,
        dispatcher: Arc<DeliveryDispatcher>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            enrichment,
            embedder,
            dispatcher,
            clock,
            config,
        }
    }

    /// Spawns every coarse-cadence loop and waits for all of them to
    /// observe shutdown. Consumes `self` wrapped in `Arc` so each loop can
    /// hold its own clone plus a clone of the shutdown receiver.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let a = self.clone();
        let b = self.clone();
        let c = self.clone();
        let d = self.clone();
        let e = self.clone();

        tokio::join!(
            a.enrichment_loop(shutdown.clone()),
            b.embedding_backfill_loop(shutdown.clone()),
            c.stale_embedding_loop(shutdown.clone()),
            d.dedup_purge_loop(shutdown.clone()),
            e.old_record_purge_loop(shutdown),
        );
        info!("scheduler shut down");
    }

    async fn enrichment_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.enrichment_cadence_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.enrichment.run_once().await {
                        Ok(outcome) => info!(
                            attempted = outcome.attempted,
                            succeeded = outcome.succeeded,
                            failed = outcome.failed,
                            "scheduled enrichment pass complete"
                        ),
                        Err(e) => error!(error = %e, "scheduled enrichment pass failed"),
                    }
                }
                _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
            }
        }
    }

    async fn embed_and_attach(&self, job: &jobsignal_store::entities::CanonicalPosting) {
        let text = job_profile_text(job);
        match self.embedder.embed(&text).await {
            Ok(vector) => {
                let embedding = Embedding {
                    vector,
                    source_text: text,
                    version: self.embedder.version().to_string(),
                    generated_at: self.clock.now(),
                };
                if let Err(e) = self.store.canonical_postings.attach_embedding(job.id, &embedding) {
                    warn!(posting_id = %job.id, error = %e, "failed to persist back-filled embedding");
                }
            }
            Err(e) => warn!(posting_id = %job.id, error = %e, "embedding back-fill call failed"),
        }
    }

    async fn embedding_backfill_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.embedding_backfill_cadence_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.store.canonical_postings.missing_embedding(BACKFILL_BATCH) {
                        Ok(jobs) => {
                            let count = jobs.len();
                            for job in &jobs {
                                self.embed_and_attach(job).await;
                            }
                            info!(count, "embedding back-fill pass complete");
                        }
                        Err(e) => error!(error = %e, "embedding back-fill query failed"),
                    }
                }
                _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
            }
        }
    }

    async fn stale_embedding_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.stale_embedding_refresh_cadence_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cutoff = self.clock.now() - ChronoDuration::days(self.config.stale_embedding_days);
                    match self.store.canonical_postings.stale_embeddings(cutoff, STALE_REFRESH_BATCH) {
                        Ok(jobs) => {
                            let count = jobs.len();
                            for job in &jobs {
                                self.embed_and_attach(job).await;
                            }
                            info!(count, "stale embedding refresh pass complete");
                        }
                        Err(e) => error!(error = %e, "stale embedding query failed"),
                    }
                }
                _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
            }
        }
    }

    async fn dedup_purge_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.dedup_purge_cadence_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.store.canonical_postings.find_duplicate_ids_to_prune() {
                        Ok(ids) => {
                            let count = ids.len();
                            for id in ids {
                                if let Err(e) = self.store.canonical_postings.delete(id) {
                                    warn!(posting_id = %id, error = %e, "failed to prune duplicate posting");
                                }
                            }
                            info!(count, "dedup purge pass complete");
                        }
                        Err(e) => error!(error = %e, "dedup purge query failed"),
                    }
                }
                _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
            }
        }
    }

    async fn old_record_purge_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.old_record_purge_cadence_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cutoff = self.clock.now() - ChronoDuration::days(self.config.old_record_days);
                    match self.store.canonical_postings.find_old_undelivered(cutoff) {
                        Ok(ids) => {
                            let count = ids.len();
                            for id in ids {
                                if let Err(e) = self.store.canonical_postings.delete(id) {
                                    warn!(posting_id = %id, error = %e, "failed to purge old undelivered posting");
                                }
                            }
                            info!(count, "old record purge pass complete");
                        }
                        Err(e) => error!(error = %e, "old record purge query failed"),
                    }
                }
                _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
            }
        }
    }

    /// Exposed so the gateway can trigger an out-of-cadence back-fill run
    /// (e.g. right after startup) through the Delivery Dispatcher.
    pub async fn run_delivery_backfill(&self, since: chrono::DateTime<chrono::Utc>) {
        match self.dispatcher.run_backfill(since).await {
            Ok(outcome) => info!(
                matched = outcome.matched,
                sent = outcome.sent,
                failed = outcome.failed,
                "delivery back-fill pass complete"
            ),
            Err(e) => error!(error = %e, "delivery back-fill pass failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobsignal_core::config::{EnrichmentConfig, MatchingConfig};
    use jobsignal_core::events::NullDeliveryTrigger;
    use jobsignal_core::types::{
        CanonicalPostingId, Currency, RawPostingId, SalaryPeriod, WorkArrangement,
    };
    use jobsignal_core::{FixedClock, JobSignalError};
    use jobsignal_enrichment::{EnrichmentCallError, EnrichmentProvider, EnrichmentRequest};
    use jobsignal_match::MatchEngine;
    use jobsignal_store::entities::{CanonicalPosting, SalaryRange};

    struct UnusedEnrichment;

    #[async_trait]
    impl EnrichmentProvider for UnusedEnrichment {
        async fn enrich(
            &self,
            _request: &EnrichmentRequest,
        ) -> Result<jobsignal_enrichment::EnrichmentModelResponse, EnrichmentCallError> {
            Err(EnrichmentCallError::Transient("not exercised in this test".into()))
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, JobSignalError> {
            Ok(vec![text.len() as f32; 8])
        }
        fn version(&self) -> &str {
            "fake-v1"
        }
    }

    struct NullChat;

    #[async_trait]
    impl jobsignal_chat::ChatSender for NullChat {
        async fn send(&self, _handle: &str, _text: &str) -> Result<(), JobSignalError> {
            Ok(())
        }
    }

    fn job_without_embedding() -> CanonicalPosting {
        CanonicalPosting {
            id: CanonicalPostingId::new(),
            raw_id: RawPostingId::new(),
            title: "Sales Rep".into(),
            company: "Acme".into(),
            display_location: "Lagos".into(),
            posting_url: "https://x".into(),
            description: "desc".into(),
            employment_type: None,
            salary_range: None,
            posted_date: chrono::Utc::now(),
            source: "test".into(),
            alternate_titles: vec![],
            required_skills: vec![],
            preferred_skills: vec![],
            industries: vec![],
            job_function: None,
            levels: vec![],
            city: None,
            state: None,
            country: None,
            work_arrangement: Some(WorkArrangement::Remote),
            remote_allowed: true,
            inferred_salary_range: Some(SalaryRange {
                min: Some(100),
                max: Some(200),
                currency: Currency::Usd,
                period: SalaryPeriod::Monthly,
            }),
            years_experience: None,
            summary: None,
            embedding: None,
            scraped_at: chrono::Utc::now(),
            ai_enhanced: false,
        }
    }

    #[tokio::test]
    async fn embedding_backfill_attaches_embedding_to_missing_postings() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = job_without_embedding();
        store.canonical_postings.insert(&job).unwrap();

        let clock: Arc<dyn Clock> = Arc::new(FixedClock(chrono::Utc::now()));
        let enrichment = Arc::new(EnrichmentWorker::new(
            store.clone(),
            Arc::new(UnusedEnrichment),
            Arc::new(FakeEmbedder),
            Arc::new(NullDeliveryTrigger),
            clock.clone(),
            EnrichmentConfig::default(),
        ));
        let dispatcher = Arc::new(DeliveryDispatcher::new(
            store.clone(),
            Arc::new(MatchEngine::new(MatchingConfig::default())),
            Arc::new(NullChat),
            clock.clone(),
            jobsignal_core::config::DeliveryConfig::default(),
        ));

        let scheduler = Scheduler::new(
            store.clone(),
            enrichment,
            Arc::new(FakeEmbedder),
            dispatcher,
            clock,
            SchedulerConfig::default(),
        );

        let jobs = store.canonical_postings.missing_embedding(10).unwrap();
        for j in &jobs {
            scheduler.embed_and_attach(j).await;
        }

        let refreshed = store.canonical_postings.find(job.id).unwrap().unwrap();
        assert!(refreshed.embedding.is_some());
    }
}
