use async_trait::async_trait;
use jobsignal_core::config::EMBEDDING_DIM;
use jobsignal_core::JobSignalError;

/// Deterministic text→vector backend. `embed` and `embed_batch` must
/// be pure functions of their input text for a given backing model version.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JobSignalError>;

    /// Batch endpoint, preferred for cold inputs. Default implementation
    /// calls `embed` sequentially; HTTP-backed providers override this
    /// with a single batched request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, JobSignalError> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    /// Model version tag stamped on every vector this provider produces.
    fn version(&self) -> &str;
}

pub fn validate_dimension(vector: &[f32]) -> Result<(), JobSignalError> {
    if vector.len() != EMBEDDING_DIM {
        return Err(JobSignalError::EmbeddingProvider(format!(
            "expected {EMBEDDING_DIM}-dimensional vector, got {}",
            vector.len()
        )));
    }
    Ok(())
}
