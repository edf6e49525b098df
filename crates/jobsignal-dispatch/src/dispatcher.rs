use std::sync::Arc;

use tracing::{info, warn};

use jobsignal_chat::{render_job_alert, ChatSender};
use jobsignal_core::config::DeliveryConfig;
use jobsignal_core::events::DeliveryTrigger;
use jobsignal_core::types::{CanonicalPostingId, DeliveryStage, UserId};
use jobsignal_core::{Clock, JobSignalError, Result};
use jobsignal_match::MatchEngine;
use jobsignal_store::delivery_history::InsertOutcome;
use jobsignal_store::entities::Preferences;
use jobsignal_store::Store;

#[derive(Debug, Default, Clone, Copy)]
pub struct DeliveryOutcome {
    pub eligible_cohort_size: usize,
    pub matched: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Owns Delivery History mutations. Holds no in-process state beyond its
/// collaborators; safe to share across the real-time trigger path and the
/// back-fill scan path.
pub struct DeliveryDispatcher {
    store: Arc<Store>,
    match_engine: Arc<MatchEngine>,
    chat: Arc<dyn ChatSender>,
    clock: Arc<dyn Clock>,
    config: DeliveryConfig,
}

impl DeliveryDispatcher {
    pub fn new(
        store: Arc<Store>,
        match_engine: Arc<MatchEngine>,
        chat: Arc<dyn ChatSender>,
        clock: Arc<dyn Clock>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            match_engine,
            chat,
            clock,
            config,
        }
    }

    /// Eligibility predicate (1)-(3): active + confirmed, open window,
    /// under the daily cap. Predicate (4) — no prior history row — is
    /// checked per-job after matching, since it's the thing matching is
    /// trying to produce.
    fn eligible_cohort(&self) -> Result<Vec<(UserId, Preferences)>> {
        let candidates = self.store.users.active_confirmed_user_ids()?;
        let today = self.clock.now().date_naive();
        let mut cohort = Vec::new();
        for user_id in candidates {
            if self.store.windows.find_active(user_id)?.is_none() {
                continue;
            }
            if self.store.delivery_history.count_for_day(user_id, today)? >= self.config.daily_cap {
                continue;
            }
            if let Some(prefs) = self.store.preferences.find(user_id)? {
                cohort.push((user_id, prefs));
            }
        }
        Ok(cohort)
    }

    /// Core algorithm, shared by the real-time trigger and the back-fill
    /// scan; only the recorded `stage` differs.
    async fn dispatch_job(&self, posting_id: CanonicalPostingId, stage: DeliveryStage) -> Result<DeliveryOutcome> {
        let Some(job) = self.store.canonical_postings.find(posting_id)? else {
            return Err(JobSignalError::NotFound(format!(
                "canonical posting {posting_id} not found"
            )));
        };

        let cohort = self.eligible_cohort()?;
        let matches = self.match_engine.match_job_against_cohort(&job, &cohort);

        let mut outcome = DeliveryOutcome {
            eligible_cohort_size: cohort.len(),
            matched: matches.len(),
            ..Default::default()
        };

        for (user_id, m) in matches {
            // Predicate (4): no prior Delivery History row for (user, job).
            if self.store.delivery_history.exists(user_id, posting_id)? {
                continue;
            }

            let insert = self.store.delivery_history.insert_before_send(
                user_id,
                posting_id,
                m.score,
                stage,
                self.clock.now(),
            )?;
            if insert == InsertOutcome::AlreadyExists {
                // Lost the race to another dispatch; the winner already sent.
                continue;
            }

            let Some(user) = self.store.users.find_by_id(user_id)? else {
                continue;
            };
            let text = render_job_alert(&job, &m);

            match self.chat.send(&user.handle, &text).await {
                Ok(()) => {
                    self.store.delivery_history.mark_sent(user_id, posting_id)?;
                    outcome.sent += 1;
                    info!(user_id = %user_id, posting_id = %posting_id, score = m.score, "job alert sent");
                }
                Err(e) => {
                    self.store
                        .delivery_history
                        .mark_send_failed(user_id, posting_id, &e.to_string())?;
                    outcome.failed += 1;
                    warn!(user_id = %user_id, posting_id = %posting_id, error = %e, "job alert send failed");
                }
            }
        }

        Ok(outcome)
    }

    /// Back-fill scan, driven by the Scheduler and also reachable from the
    /// Reminder Daemon. Re-dispatches every canonical posting from the
    /// matching window's recency cutoff against the current eligible
    /// cohort; predicate (4) makes repeat calls a no-op for jobs already
    /// delivered.
    pub async fn run_backfill(&self, since: chrono::DateTime<chrono::Utc>) -> Result<DeliveryOutcome> {
        let candidates = self.store.canonical_postings.recent_with_embedding(since)?;
        let mut total = DeliveryOutcome::default();
        for job in candidates {
            let outcome = self.dispatch_job(job.id, DeliveryStage::BackFill).await?;
            total.eligible_cohort_size = total.eligible_cohort_size.max(outcome.eligible_cohort_size);
            total.matched += outcome.matched;
            total.sent += outcome.sent;
            total.failed += outcome.failed;
        }
        Ok(total)
    }
}

#[async_trait::async_trait]
impl DeliveryTrigger for DeliveryDispatcher {
    /// Real-time path: invoked synchronously by the Enrichment Worker
    /// immediately after canonical posting + embedding are persisted.
    async fn on_canonical_posting_ready(&self, posting_id: CanonicalPostingId) -> Result<()> {
        let outcome = self.dispatch_job(posting_id, DeliveryStage::RealTime).await?;
        info!(
            posting_id = %posting_id,
            eligible = outcome.eligible_cohort_size,
            matched = outcome.matched,
            sent = outcome.sent,
            failed = outcome.failed,
            "real-time dispatch complete"
        );
        Ok(())
    }
}
