//! Top-level search coordination: Rewrite → Hybrid Gather → AI Score →
//! Fuse → Sort/Limit, plus the minor suggestion and health operations.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::RwLock;

use crate::config::{Config, LlmConfig};
use crate::llm::embeddings::embed_query;
use crate::llm::rewrite::rewrite_query;
use crate::llm::score::score_restaurants;
use crate::models::{
    HealthResponse, ScoredCandidate, SearchFilters, SearchResponse, MAX_LIMIT,
};
use crate::search::hours::is_open_now;
use crate::search::hybrid::HybridSearch;
use crate::search::vector::VectorRetriever;
use crate::store::RestaurantStore;

/// Weights for the final score fusion. The LLM pass has read actual
/// review text and dominates; vector similarity is a broad semantic
/// floor; keyword score is the most literal signal and weighs least.
const VECTOR_WEIGHT: f32 = 0.20;
const KEYWORD_WEIGHT: f32 = 0.15;
const LLM_WEIGHT: f32 = 0.65;

/// Fixed phrase list backing the autocomplete endpoint.
const SUGGESTIONS: &[&str] = &[
    "affordable italian dinner",
    "romantic date night spot",
    "sushi lunch special",
    "family friendly with outdoor seating",
    "steakhouse with a view",
    "vegan breakfast cafe",
    "seafood on the waterfront",
    "late night burgers",
    "tapas and wine bar",
    "quick healthy lunch",
    "best coffee and pastries",
    "curry house open late",
];

const MAX_SUGGESTIONS: usize = 8;

pub struct SearchService {
    client: reqwest::Client,
    llm_config: Arc<RwLock<LlmConfig>>,
    store: Arc<dyn RestaurantStore>,
    retriever: Arc<dyn VectorRetriever>,
    hybrid: HybridSearch,
}

impl SearchService {
    pub fn new(
        client: reqwest::Client,
        llm_config: Arc<RwLock<LlmConfig>>,
        store: Arc<dyn RestaurantStore>,
        retriever: Arc<dyn VectorRetriever>,
        config: &Config,
    ) -> Self {
        let hybrid = HybridSearch::new(
            store.clone(),
            retriever.clone(),
            config.vector.top_k,
            config.store.fallback_page_size,
        );
        Self {
            client,
            llm_config,
            store,
            retriever,
            hybrid,
        }
    }

    /// The pipeline's single entry point.
    ///
    /// Always returns a `SearchResponse` on degraded paths (failed
    /// rewrite, failed AI scoring, vector outage); raises only on fatal
    /// data-store or orchestration errors — so callers can distinguish
    /// "no results" from "search failed".
    pub async fn search_restaurants(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let mut steps = Vec::new();
        let limit = limit.clamp(1, MAX_LIMIT);
        let llm = self.llm_config.read().clone();

        // ── Rewrite ──────────────────────────────────────────
        let step = Instant::now();
        let rewritten = rewrite_query(&self.client, &llm, query).await;
        steps.push(format!("rewrite: {}ms", step.elapsed().as_millis()));

        // ── Hybrid gather ────────────────────────────────────
        let step = Instant::now();
        let candidates = self
            .hybrid
            .execute(query, &rewritten, filters, limit)
            .await?;
        steps.push(format!(
            "hybrid: {}ms ({} candidates)",
            step.elapsed().as_millis(),
            candidates.len()
        ));

        // ── AI score ─────────────────────────────────────────
        let step = Instant::now();
        let mut results = score_restaurants(&self.client, &llm, candidates, query).await;
        steps.push(format!("ai_score: {}ms", step.elapsed().as_millis()));

        // ── Fuse + sort/limit ────────────────────────────────
        let step = Instant::now();
        for result in &mut results {
            result.ai_match_score =
                fuse_scores(result.vector_score, result.keyword_score, result.llm_score);
            result.open_now = open_now_signal(result);
        }
        // Stable sort: equal scores keep their upstream order
        results.sort_by(|a, b| b.ai_match_score.cmp(&a.ai_match_score));
        results.truncate(limit);
        steps.push(format!("fuse: {}ms", step.elapsed().as_millis()));

        let took_ms = started.elapsed().as_millis() as u64;
        tracing::info!("Search for {query:?} returned {} results in {took_ms}ms", results.len());

        Ok(SearchResponse {
            query: query.to_string(),
            rewritten_query: rewritten,
            results,
            steps,
            took_ms,
        })
    }

    /// Static substring autocomplete over a fixed phrase list.
    pub fn search_suggestions(&self, prefix: &str) -> Vec<String> {
        filter_suggestions(prefix)
    }

    /// Probe each collaborator and report a status string per sub-service.
    pub async fn check_health(&self) -> HealthResponse {
        let datastore = match self.store.fetch_page(1).await {
            Ok(_) => "ok".to_string(),
            Err(e) => format!("error: {e}"),
        };
        let vector_index = match self.retriever.health().await {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("error: {e}"),
        };
        let llm = {
            let config = self.llm_config.read().clone();
            match embed_query(&self.client, &config, "health").await {
                Ok(_) => "ok".to_string(),
                Err(e) => format!("error: {e}"),
            }
        };

        let status = if datastore == "ok" && vector_index == "ok" && llm == "ok" {
            "ok".to_string()
        } else {
            "degraded".to_string()
        };

        HealthResponse {
            status,
            datastore,
            vector_index,
            llm,
        }
    }
}

/// Weighted fusion of the three signals, rounded to an integer score.
/// Monotonic in each input; (100, 100, 100) fuses to exactly 100.
pub fn fuse_scores(vector_score: f32, keyword_score: f32, llm_score: u8) -> u8 {
    let fused = vector_score * VECTOR_WEIGHT
        + keyword_score * KEYWORD_WEIGHT
        + llm_score as f32 * LLM_WEIGHT;
    fused.round().clamp(0.0, 100.0) as u8
}

fn open_now_signal(result: &ScoredCandidate) -> Option<bool> {
    if result.restaurant.opening_hours.is_empty() {
        None
    } else {
        Some(is_open_now(&result.restaurant.opening_hours))
    }
}

pub fn filter_suggestions(prefix: &str) -> Vec<String> {
    let needle = prefix.trim().to_lowercase();
    SUGGESTIONS
        .iter()
        .filter(|phrase| needle.is_empty() || phrase.contains(&needle))
        .take(MAX_SUGGESTIONS)
        .map(|phrase| phrase.to_string())
        .collect()
}
