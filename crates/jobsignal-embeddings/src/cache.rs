//! Content-hash LRU cache in front of an `EmbeddingProvider`. Keyed by a
//! 16-byte digest of the input text; process-local — diverging caches
//! between processes are safe because embeddings are deterministic per
//! input.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};

use jobsignal_core::JobSignalError;

use crate::provider::EmbeddingProvider;

fn content_hash(text: &str) -> [u8; 16] {
    let digest = Sha256::digest(text.as_bytes());
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[..16]);
    key
}

pub struct CachingEmbeddingProvider<P: EmbeddingProvider> {
    inner: P,
    cache: Mutex<LruCache<[u8; 16], Vec<f32>>>,
}

impl<P: EmbeddingProvider> CachingEmbeddingProvider<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachingEmbeddingProvider<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JobSignalError> {
        let key = content_hash(text);
        if let Some(hit) = self.cache.lock().unwrap().get(&key).cloned() {
            return Ok(hit);
        }
        let vector = self.inner.embed(text).await?;
        self.cache.lock().unwrap().put(key, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, JobSignalError> {
        let keys: Vec<[u8; 16]> = texts.iter().map(|t| content_hash(t)).collect();

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut cold_indices = Vec::new();
        let mut cold_texts = Vec::new();
        {
            let mut cache = self.cache.lock().unwrap();
            for (i, key) in keys.iter().enumerate() {
                if let Some(hit) = cache.get(key).cloned() {
                    results.push(Some(hit));
                } else {
                    results.push(None);
                    cold_indices.push(i);
                    cold_texts.push(texts[i].clone());
                }
            }
        }

        if !cold_texts.is_empty() {
            let fresh = self.inner.embed_batch(&cold_texts).await?;
            let mut cache = self.cache.lock().unwrap();
            for (slot, vector) in cold_indices.into_iter().zip(fresh.into_iter()) {
                cache.put(keys[slot], vector.clone());
                results[slot] = Some(vector);
            }
        }

        Ok(results.into_iter().map(|r| r.unwrap_or_default()).collect())
    }

    fn version(&self) -> &str {
        self.inner.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, JobSignalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32; 4])
        }

        fn version(&self) -> &str {
            "test-v1"
        }
    }

    #[tokio::test]
    async fn repeated_embed_of_same_text_hits_cache() {
        let provider = CachingEmbeddingProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            16,
        );
        provider.embed("hello").await.unwrap();
        provider.embed("hello").await.unwrap();
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_only_fetches_cold_entries() {
        let provider = CachingEmbeddingProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            16,
        );
        provider.embed("warm").await.unwrap();
        let results = provider
            .embed_batch(&["warm".to_string(), "cold".to_string()])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
