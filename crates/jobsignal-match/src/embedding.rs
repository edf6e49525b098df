//! Embedding Matcher: primary matcher, cosine similarity between a user's
//! preference embedding and a candidate job's embedding.

use jobsignal_core::types::{cosine_similarity, Embedding};

use crate::types::{MatchOutcome, MatcherKind};

/// Scores one (user, job) pair by cosine similarity. Returns `None` if
/// either side lacks an embedding, the versions are incompatible (invariant
/// 6), or similarity falls below `threshold`.
pub fn score(
    user_embedding: Option<&Embedding>,
    job_embedding: Option<&Embedding>,
    threshold: f64,
) -> Option<MatchOutcome> {
    let u = user_embedding?;
    let v = job_embedding?;
    if u.version != v.version {
        return None;
    }
    if u.vector.len() != v.vector.len() {
        return None;
    }

    let sim = cosine_similarity(&u.vector, &v.vector);
    if sim < threshold {
        return None;
    }

    let pct = (sim * 100.0).round();
    Some(MatchOutcome {
        score: (sim * 100.0).min(100.0).max(0.0),
        reasons: vec![format!("semantic similarity: {pct}%")],
        matcher: MatcherKind::Embedding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn embedding(vector: Vec<f32>, version: &str) -> Embedding {
        Embedding {
            vector,
            source_text: "x".into(),
            version: version.into(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn identical_vectors_score_one_hundred() {
        let e = embedding(vec![1.0, 2.0, 3.0], "v1");
        let outcome = score(Some(&e), Some(&e), 0.65).unwrap();
        assert!((outcome.score - 100.0).abs() < 1e-6);
        assert_eq!(outcome.matcher, MatcherKind::Embedding);
    }

    #[test]
    fn similarity_exactly_at_threshold_is_included() {
        // Two vectors with cosine similarity exactly 0.65 by construction:
        // a=(1,0), b=(0.65, sqrt(1-0.65^2)).
        let a = embedding(vec![1.0, 0.0], "v1");
        let theta = (0.65f64).acos();
        let b = embedding(vec![theta.cos() as f32, theta.sin() as f32], "v1");
        let outcome = score(Some(&a), Some(&b), 0.65);
        assert!(outcome.is_some());
        let outcome = outcome.unwrap();
        assert!((outcome.score - 65.0).abs() < 0.05);
    }

    #[test]
    fn similarity_just_below_threshold_is_excluded() {
        let a = embedding(vec![1.0, 0.0], "v1");
        let theta = (0.64f64).acos();
        let b = embedding(vec![theta.cos() as f32, theta.sin() as f32], "v1");
        assert!(score(Some(&a), Some(&b), 0.65).is_none());
    }

    #[test]
    fn missing_embedding_on_either_side_yields_none() {
        let e = embedding(vec![1.0, 0.0], "v1");
        assert!(score(None, Some(&e), 0.65).is_none());
        assert!(score(Some(&e), None, 0.65).is_none());
    }

    #[test]
    fn incompatible_versions_are_rejected() {
        let a = embedding(vec![1.0, 0.0], "v1");
        let b = embedding(vec![1.0, 0.0], "v2");
        assert!(score(Some(&a), Some(&b), 0.65).is_none());
    }
}
