//! Preference Projector: re-renders a user's profile text after any
//! preference write and refreshes their embedding. Idempotent and safe to
//! retry; on embedding-service failure the prior embedding is left intact
//! and a warning surfaces instead of an error.

use chrono::Utc;
use tracing::warn;

use jobsignal_core::clock::Clock;
use jobsignal_core::types::{Embedding, UserId};
use jobsignal_core::JobSignalError;
use jobsignal_store::preferences::PreferenceRepo;

use crate::profile_text::user_profile_text;
use crate::provider::EmbeddingProvider;

pub struct PreferenceProjector<P: EmbeddingProvider> {
    preferences: PreferenceRepo,
    embedder: P,
}

impl<P: EmbeddingProvider> PreferenceProjector<P> {
    pub fn new(preferences: PreferenceRepo, embedder: P) -> Self {
        Self {
            preferences,
            embedder,
        }
    }

    /// Re-renders and persists `user_id`'s embedding. Returns `Ok(true)` if
    /// a new vector was written, `Ok(false)` if the rendered text was
    /// unchanged from the last embedding (no-op, no provider call).
    pub async fn project(&self, user_id: UserId, clock: &dyn Clock) -> Result<bool, JobSignalError> {
        let prefs = self
            .preferences
            .find(user_id)?
            .ok_or_else(|| JobSignalError::NotFound(format!("preferences for user {user_id}")))?;

        let source_text = user_profile_text(&prefs);
        if let Some(existing) = &prefs.embedding {
            if existing.source_text == source_text {
                return Ok(false);
            }
        }
        if source_text.is_empty() {
            return Ok(false);
        }

        match self.embedder.embed(&source_text).await {
            Ok(vector) => {
                let embedding = Embedding {
                    vector,
                    source_text,
                    version: self.embedder.version().to_string(),
                    generated_at: clock.now(),
                };
                self.preferences.update_embedding(user_id, &embedding)?;
                Ok(true)
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "embedding provider failed; keeping prior embedding");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobsignal_core::clock::FixedClock;
    use jobsignal_store::entities::Preferences;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, JobSignalError> {
            Ok(vec![text.len() as f32; 4])
        }
        fn version(&self) -> &str {
            "fake-v1"
        }
    }

    fn test_repo() -> PreferenceRepo {
        let conn = Connection::open_in_memory().unwrap();
        jobsignal_store::schema::init_db(&conn).unwrap();
        PreferenceRepo::new(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn projects_embedding_for_nonempty_profile() {
        let repo = test_repo();
        let uid = UserId::new();
        let mut prefs = Preferences::empty(uid);
        prefs.desired_roles = vec!["Engineer".into()];
        repo.upsert(&prefs).unwrap();

        let projector = PreferenceProjector::new(repo, FakeEmbedder);
        let clock = FixedClock(Utc::now());
        let changed = projector.project(uid, &clock).await.unwrap();
        assert!(changed);

        let reloaded = projector.preferences.find(uid).unwrap().unwrap();
        assert!(reloaded.embedding.is_some());
    }

    #[tokio::test]
    async fn second_projection_with_unchanged_text_is_a_no_op() {
        let repo = test_repo();
        let uid = UserId::new();
        let mut prefs = Preferences::empty(uid);
        prefs.desired_roles = vec!["Engineer".into()];
        repo.upsert(&prefs).unwrap();

        let projector = PreferenceProjector::new(repo, FakeEmbedder);
        let clock = FixedClock(Utc::now());
        projector.project(uid, &clock).await.unwrap();
        let changed_again = projector.project(uid, &clock).await.unwrap();
        assert!(!changed_again);
    }
}
