//! HTTP-backed `EmbeddingProvider` against an OpenAI-compatible
//! `/v1/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use jobsignal_core::JobSignalError;

use crate::provider::{validate_dimension, EmbeddingProvider};

pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    version: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String, base_url: String, model: String, version: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url,
            model,
            version,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JobSignalError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| JobSignalError::EmbeddingProvider("empty response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, JobSignalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.model, "requesting embeddings");

        let url = format!("{}/v1/embeddings", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| JobSignalError::EmbeddingProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %body, "embedding provider error");
            return Err(JobSignalError::EmbeddingProvider(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| JobSignalError::EmbeddingProvider(e.to_string()))?;

        let mut ordered: Vec<Option<Vec<f32>>> = (0..texts.len()).map(|_| None).collect();
        for datum in parsed.data {
            if let Some(slot) = ordered.get_mut(datum.index) {
                *slot = Some(datum.embedding);
            }
        }

        let mut out = Vec::with_capacity(texts.len());
        for (i, slot) in ordered.into_iter().enumerate() {
            let v = slot.ok_or_else(|| {
                JobSignalError::EmbeddingProvider(format!("missing embedding at index {i}"))
            })?;
            validate_dimension(&v)?;
            out.push(v);
        }
        Ok(out)
    }

    fn version(&self) -> &str {
        &self.version
    }
}
