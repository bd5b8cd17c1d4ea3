//! Nearest-neighbour retrieval against the restaurant-chunk index.
//!
//! The retriever embeds the query and runs top-K search in one contract;
//! the index itself is an external collaborator reached over HTTP. This
//! module also owns the similarity-to-score mapping.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{LlmConfig, VectorIndexConfig};
use crate::llm::embeddings::embed_query;
use crate::models::VectorMatch;

/// Raw similarities below this floor never reach the mapping in practice:
/// the index has already discarded them by not returning them in top-K.
const SIMILARITY_FLOOR: f32 = 0.3;

/// Map a raw cosine-style similarity into a human-legible 0-100 score.
///
/// "Generous but objective": real-world similarities cluster in 0.3-0.9,
/// so the curve stretches that band across 50-98. A retrieved-at-all
/// match never scores below 50, and nothing ever scores a perfect 100.
pub fn similarity_to_score(raw: f32) -> f32 {
    let clamped = raw.clamp(SIMILARITY_FLOOR, 1.0);
    let normalized = (clamped - SIMILARITY_FLOOR) / 0.7;
    let curved = normalized.powf(0.6);
    50.0 + 48.0 * curved
}

/// Embed a query and run nearest-neighbour search over restaurant chunks.
///
/// Failures (embedding call, index unreachable) propagate: the hybrid
/// orchestrator catches them to trigger its keyword-only fallback, so
/// this layer must not swallow errors.
#[async_trait]
pub trait VectorRetriever: Send + Sync {
    /// Return up to `top_k` matches for the query text, metadata
    /// included, raw vector values excluded.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Cheap availability probe for the health endpoint.
    async fn health(&self) -> Result<()>;
}

/// Production retriever: embedding via the LLM provider, search against a
/// Pinecone-style HTTP index.
pub struct HttpVectorRetriever {
    client: reqwest::Client,
    llm_config: Arc<RwLock<LlmConfig>>,
    config: VectorIndexConfig,
}

impl HttpVectorRetriever {
    pub fn new(
        client: reqwest::Client,
        llm_config: Arc<RwLock<LlmConfig>>,
        config: VectorIndexConfig,
    ) -> Self {
        Self {
            client,
            llm_config,
            config,
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => req.header("Api-Key", key),
            None => req,
        }
    }

    async fn query_index(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let url = format!("{}/query", self.config.base_url.trim_end_matches('/'));

        let req = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let resp = self
            .auth(self.client.post(&url))
            .json(&req)
            .send()
            .await
            .context("Failed to reach vector index")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector index returned {status}: {body}");
        }

        let body: QueryResponse = resp
            .json()
            .await
            .context("Failed to parse vector index response")?;

        // Chunks without a restaurant id in their metadata are unusable
        Ok(body
            .matches
            .into_iter()
            .filter_map(|m| {
                let place_id = m.metadata.get("restaurant_id")?.as_str()?.to_string();
                Some(VectorMatch {
                    place_id,
                    similarity: m.score,
                    chunk_type: str_field(&m.metadata, "chunk_type"),
                    chunk_content: str_field(&m.metadata, "text"),
                })
            })
            .collect())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Deserialize)]
struct RawMatch {
    score: f32,
    #[serde(default)]
    metadata: Value,
}

#[async_trait]
impl VectorRetriever for HttpVectorRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorMatch>> {
        let llm = self.llm_config.read().clone();
        let embedding = embed_query(&self.client, &llm, query)
            .await
            .context("Failed to embed query")?;
        self.query_index(&embedding, top_k).await
    }

    async fn health(&self) -> Result<()> {
        let url = format!(
            "{}/describe_index_stats",
            self.config.base_url.trim_end_matches('/')
        );

        let resp = self
            .auth(self.client.post(&url))
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Failed to reach vector index")?;

        if !resp.status().is_success() {
            anyhow::bail!("Vector index returned {}", resp.status());
        }
        Ok(())
    }
}

fn str_field(metadata: &Value, key: &str) -> String {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
