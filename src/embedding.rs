//! Embedding client abstraction and the session-scoped embedding cache.
//!
//! - **[`Embedder`]**: the seam every embedding backend implements.
//! - **[`OpenAIEmbedder`]**: calls the OpenAI (or Azure OpenAI) embeddings API.
//! - **[`EmbeddingCache`]**: exact-string memoization with a `get_or_compute` operation.
//! - **[`CachedEmbedder`]**: an [`Embedder`] paired with its cache; this is what
//!   the pipeline holds.
//!
//! # Caching
//!
//! Within one session, embedding the same text twice issues at most one
//! outbound call. Failed computations are not cached, so a later attempt
//! retries the service. The cache is never shared across sessions.
//!
//! # Errors
//!
//! Network and service errors propagate unchanged. There is no retry and no
//! fallback vector.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::openai::OpenAIEndpoint;

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;

    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ============ OpenAI Embedder ============

/// Embedder backed by the OpenAI embeddings endpoint.
///
/// Sends `{model, input}` to `POST .../embeddings` and returns
/// `data[0].embedding`.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: OpenAIEndpoint,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(client: reqwest::Client, endpoint: OpenAIEndpoint, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, chars = text.len(), "requesting embedding");
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = self
            .endpoint
            .post_json(&self.client, &self.model, "embeddings", &body)
            .await?;
        parse_embedding_response(&json)
    }
}

/// Parse the embeddings API response JSON and return the first vector.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid embedding response: missing data array"))?
        .first()
        .ok_or_else(|| anyhow!("Empty embedding response"))?;

    let embedding = first
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid embedding response: missing embedding"))?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow!("Invalid embedding response: non-numeric value"))
        })
        .collect()
}

// ============ Cache ============

/// Exact-string memoization of embedding vectors.
///
/// Lookups and inserts take a short lock that is never held across an
/// `.await`; the computation itself runs unlocked.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached vector for `text`, or run `compute` and cache its result.
    pub async fn get_or_compute<F, Fut>(&self, text: &str, compute: F) -> Result<Vec<f32>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<f32>>>,
    {
        if let Some(hit) = self.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("embedding cache hit");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("embedding cache miss");
        let vector = compute().await?;
        self.lock().insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.lock().get(text).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<f32>>> {
        // A poisoned map only means a panic happened mid-insert elsewhere;
        // the entries themselves are still whole vectors.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// An [`Embedder`] with a session-owned [`EmbeddingCache`] in front of it.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self {
            inner,
            cache: EmbeddingCache::new(),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    /// Embed `text`, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Fails on empty input, or when the underlying embedder fails.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            bail!("cannot embed empty text");
        }
        let inner = Arc::clone(&self.inner);
        self.cache
            .get_or_compute(text, || async move { inner.embed(text).await })
            .await
    }
}
