//! Vector similarity search client.
//!
//! [`VectorIndex`] is the seam to the managed similarity-search service.
//! [`PineconeIndex`] implements it against a Pinecone index host. The
//! pipeline talks to [`VectorSearch`], which validates input before the
//! outbound call and enforces the output contract after it:
//!
//! - at most `top_k` matches
//! - scores non-increasing in result order
//!
//! The index is only ever read; nothing here upserts or deletes.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::VectorConfig;
use crate::models::VectorMatch;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` matches for `vector`, best first, with metadata.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;
}

// ============ Pinecone ============

/// Client for a Pinecone index data-plane host.
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    pub fn new(
        client: reqwest::Client,
        host: impl Into<String>,
        api_key: impl Into<String>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            namespace,
        }
    }

    /// Create a client from config, reading the API key from the environment.
    pub fn from_config(client: reqwest::Client, config: &VectorConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        Ok(Self::new(
            client,
            config.host.clone(),
            api_key,
            config.namespace.clone(),
        ))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let mut body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(ns) = &self.namespace {
            body["namespace"] = serde_json::Value::String(ns.clone());
        }

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Pinecone query request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Pinecone API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_query_response(&json)
    }
}

/// Parse a Pinecone `/query` response. Missing metadata becomes an empty map.
fn parse_query_response(json: &serde_json::Value) -> Result<Vec<VectorMatch>> {
    let matches = json
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| anyhow!("Invalid Pinecone response: missing matches array"))?;

    matches
        .iter()
        .map(|m| {
            let id = m
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("Invalid Pinecone response: match without id"))?;
            let score = m
                .get("score")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| anyhow!("Invalid Pinecone response: match without score"))?;
            let metadata = m
                .get("metadata")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            Ok(VectorMatch {
                id: id.to_string(),
                score,
                metadata,
            })
        })
        .collect()
}

// ============ Contract wrapper ============

/// Validating front for a [`VectorIndex`].
pub struct VectorSearch {
    index: Arc<dyn VectorIndex>,
    dims: usize,
}

impl VectorSearch {
    /// `dims` is the dimension the index was built with.
    pub fn new(index: Arc<dyn VectorIndex>, dims: usize) -> Self {
        Self { index, dims }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Query the index and return at most `top_k` matches, best first.
    ///
    /// # Errors
    ///
    /// Fails before any outbound call when `top_k` is zero or the vector's
    /// dimension differs from the index's; otherwise propagates service errors.
    pub async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        if top_k == 0 {
            bail!("top_k must be >= 1");
        }
        if vector.len() != self.dims {
            bail!(
                "embedding dimension {} does not match index dimension {}",
                vector.len(),
                self.dims
            );
        }

        let mut matches = self.index.query(vector, top_k).await?;
        debug!(top_k, returned = matches.len(), "vector search complete");

        // Stable, so ties keep the service's order.
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
