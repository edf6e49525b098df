//! Match Engine: the seam the Delivery Dispatcher and Reminder Daemon
//! back-fill scan call through. Embedding Matcher is primary; the Rule
//! Matcher runs whenever either side of the pair lacks a usable embedding.

use jobsignal_core::config::MatchingConfig;
use jobsignal_core::types::CanonicalPostingId;
use jobsignal_store::entities::{CanonicalPosting, Preferences};

use crate::types::MatchOutcome;
use crate::{embedding, rule};

pub struct MatchEngine {
    config: MatchingConfig,
}

impl MatchEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Scores a single (user, job) pair. Embedding matcher first; rule
    /// matcher only runs when the embedding matcher declined to score the
    /// pair at all (missing/incompatible embeddings), not merely when it
    /// scored below threshold — a below-threshold embedding match is a
    /// genuine semantic signal the rule matcher shouldn't override.
    pub fn match_pair(&self, prefs: &Preferences, job: &CanonicalPosting) -> Option<MatchOutcome> {
        if prefs.embedding.is_some() && job.embedding.is_some() {
            if let Some(outcome) = embedding::score(
                prefs.embedding.as_ref(),
                job.embedding.as_ref(),
                self.config.similarity_threshold,
            ) {
                return Some(outcome);
            }
            // Embeddings present but similarity below threshold: no match,
            // fallback to rule matcher is not attempted.
            return None;
        }

        rule::score(prefs, job).filter(|o| o.score >= self.config.rule_threshold)
    }

    /// Real-time dispatch path: one job against the eligible cohort,
    /// returning matches ordered score descending.
    pub fn match_job_against_cohort<'a>(
        &self,
        job: &CanonicalPosting,
        cohort: &'a [(jobsignal_core::types::UserId, Preferences)],
    ) -> Vec<(jobsignal_core::types::UserId, MatchOutcome)> {
        let mut matches: Vec<_> = cohort
            .iter()
            .filter_map(|(user_id, prefs)| self.match_pair(prefs, job).map(|m| (*user_id, m)))
            .collect();
        matches.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap());
        tracing::debug!(job_id = %job.id, cohort_size = cohort.len(), matched = matches.len(), "scored job against cohort");
        matches
    }

    /// Back-fill path: one user against a candidate set of jobs, top-L by
    /// score, ties broken by `posted_date` descending.
    pub fn rank_jobs_for_user(
        &self,
        prefs: &Preferences,
        candidates: &[CanonicalPosting],
    ) -> Vec<(CanonicalPostingId, MatchOutcome)> {
        let mut matches: Vec<_> = candidates
            .iter()
            .filter_map(|job| {
                self.match_pair(prefs, job)
                    .map(|m| (job.id, job.posted_date, m))
            })
            .collect();

        matches.sort_by(|a, b| {
            b.2.score
                .partial_cmp(&a.2.score)
                .unwrap()
                .then_with(|| b.1.cmp(&a.1))
        });
        matches.truncate(self.config.top_l);
        matches.into_iter().map(|(id, _, m)| (id, m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jobsignal_core::types::{
        CanonicalPostingId, Embedding, RawPostingId, UserId, WorkArrangement,
    };

    fn job_with_embedding(vector: Vec<f32>, posted_days_ago: i64) -> CanonicalPosting {
        CanonicalPosting {
            id: CanonicalPostingId::new(),
            raw_id: RawPostingId::new(),
            title: "Software Engineer".into(),
            company: "Acme".into(),
            display_location: "Lagos".into(),
            posting_url: "https://example.com".into(),
            description: "desc".into(),
            employment_type: None,
            salary_range: None,
            posted_date: Utc::now() - Duration::days(posted_days_ago),
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
            inferred_salary_range: None,
            years_experience: None,
            summary: None,
            embedding: Some(Embedding {
                vector,
                source_text: "x".into(),
                version: "v1".into(),
                generated_at: Utc::now(),
            }),
            scraped_at: Utc::now(),
            ai_enhanced: true,
        }
    }

    fn prefs_with_embedding(vector: Vec<f32>) -> Preferences {
        let mut p = Preferences::empty(UserId::new());
        p.embedding = Some(Embedding {
            vector,
            source_text: "y".into(),
            version: "v1".into(),
            generated_at: Utc::now(),
        });
        p
    }

    #[test]
    fn embedding_match_wins_over_rule_when_both_available() {
        let engine = MatchEngine::new(MatchingConfig::default());
        let prefs = prefs_with_embedding(vec![1.0, 0.0]);
        let job = job_with_embedding(vec![1.0, 0.0], 1);
        let outcome = engine.match_pair(&prefs, &job).unwrap();
        assert_eq!(outcome.matcher, crate::types::MatcherKind::Embedding);
    }

    #[test]
    fn falls_back_to_rule_matcher_without_embeddings() {
        let engine = MatchEngine::new(MatchingConfig::default());
        let mut prefs = Preferences::empty(UserId::new());
        prefs.work_arrangements = vec![WorkArrangement::Remote];
        let mut job = job_with_embedding(vec![1.0, 0.0], 1);
        job.embedding = None;
        let outcome = engine.match_pair(&prefs, &job);
        assert!(outcome.is_none() || outcome.unwrap().matcher == crate::types::MatcherKind::Rule);
    }

    #[test]
    fn rank_jobs_for_user_orders_by_score_then_recency() {
        let engine = MatchEngine::new(MatchingConfig::default());
        let prefs = prefs_with_embedding(vec![1.0, 0.0]);
        let older = job_with_embedding(vec![1.0, 0.0], 10);
        let newer = job_with_embedding(vec![1.0, 0.0], 1);
        let ranked = engine.rank_jobs_for_user(&prefs, &[older.clone(), newer.clone()]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, newer.id);
    }

    #[test]
    fn top_l_truncates_candidate_set() {
        let mut config = MatchingConfig::default();
        config.top_l = 1;
        let engine = MatchEngine::new(config);
        let prefs = prefs_with_embedding(vec![1.0, 0.0]);
        let a = job_with_embedding(vec![1.0, 0.0], 1);
        let b = job_with_embedding(vec![1.0, 0.0], 2);
        let ranked = engine.rank_jobs_for_user(&prefs, &[a, b]);
        assert_eq!(ranked.len(), 1);
    }
}
