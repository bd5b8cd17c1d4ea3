//! Integration tests for the search pipeline.
//!
//! These exercise the hybrid gathering and full service flow against
//! in-memory collaborators. No LLM is running: the rewrite and AI-scoring
//! stages must degrade to their documented fallbacks, which is exactly
//! what these tests assert.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use chow_search::config::{Config, LlmConfig};
use chow_search::llm::score::FALLBACK_REASONING;
use chow_search::models::{Restaurant, Review, SearchFilters, VectorMatch};
use chow_search::search::hybrid::HybridSearch;
use chow_search::search::vector::VectorRetriever;
use chow_search::service::SearchService;
use chow_search::store::RestaurantStore;

// ─── In-memory collaborators ─────────────────────────────

struct InMemoryStore {
    restaurants: Vec<Restaurant>,
    reviews: HashMap<String, Vec<Review>>,
}

#[async_trait]
impl RestaurantStore for InMemoryStore {
    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<Restaurant>> {
        Ok(self
            .restaurants
            .iter()
            .filter(|r| ids.contains(&r.place_id))
            .cloned()
            .collect())
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<Restaurant>> {
        self.fetch_summaries(ids).await
    }

    async fn fetch_reviews(
        &self,
        ids: &[String],
        per_restaurant: usize,
    ) -> Result<HashMap<String, Vec<Review>>> {
        Ok(self
            .reviews
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, list)| {
                (
                    id.clone(),
                    list.iter().take(per_restaurant).cloned().collect(),
                )
            })
            .collect())
    }

    async fn fetch_page(&self, limit: usize) -> Result<Vec<Restaurant>> {
        Ok(self.restaurants.iter().take(limit).cloned().collect())
    }
}

/// Returns a fixed match list, ignoring the query text.
struct StubRetriever {
    matches: Vec<VectorMatch>,
}

#[async_trait]
impl VectorRetriever for StubRetriever {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<VectorMatch>> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Simulates a vector-infrastructure outage.
struct FailingRetriever;

#[async_trait]
impl VectorRetriever for FailingRetriever {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<VectorMatch>> {
        anyhow::bail!("connection refused")
    }

    async fn health(&self) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}

// ─── Fixtures ────────────────────────────────────────────

fn restaurant(id: &str, name: &str, cuisines: &[&str]) -> Restaurant {
    Restaurant {
        place_id: id.to_string(),
        name: name.to_string(),
        cuisines: cuisines.iter().map(|c| c.to_string()).collect(),
        neighborhood: "City Centre".to_string(),
        address: format!("{id} Long Street"),
        rating: 4.2,
        review_count: 150,
        price_level: Some(2),
        features: vec!["outdoor seating".to_string()],
        ..Default::default()
    }
}

fn vm(id: &str, similarity: f32) -> VectorMatch {
    VectorMatch {
        place_id: id.to_string(),
        similarity,
        chunk_type: "overview".to_string(),
        chunk_content: String::new(),
    }
}

/// Five restaurants, two with "Italian" in the name.
fn sample_restaurants() -> Vec<Restaurant> {
    vec![
        restaurant("p1", "Bella Italian Kitchen", &["Italian", "Pizza"]),
        restaurant("p2", "Little Italian Corner", &["Italian"]),
        restaurant("p3", "Dragon Palace", &["Chinese"]),
        restaurant("p4", "Ocean Basket", &["Seafood"]),
        restaurant("p5", "Burger Yard", &["Burgers", "American"]),
    ]
}

/// Twelve chunk matches spanning the five restaurants.
fn sample_matches() -> Vec<VectorMatch> {
    vec![
        vm("p1", 0.82),
        vm("p1", 0.74),
        vm("p1", 0.60),
        vm("p2", 0.78),
        vm("p2", 0.55),
        vm("p3", 0.66),
        vm("p3", 0.50),
        vm("p3", 0.48),
        vm("p4", 0.58),
        vm("p4", 0.45),
        vm("p5", 0.52),
        vm("p5", 0.40),
    ]
}

fn sample_reviews() -> HashMap<String, Vec<Review>> {
    let mut reviews = HashMap::new();
    reviews.insert(
        "p1".to_string(),
        (0..10)
            .map(|i| Review {
                author: format!("diner {i}"),
                rating: 5.0,
                text: format!("Wonderful pasta, visit number {i}"),
            })
            .collect(),
    );
    reviews.insert(
        "p2".to_string(),
        vec![Review {
            author: "a".to_string(),
            rating: 4.0,
            text: "Affordable and authentic".to_string(),
        }],
    );
    reviews
}

fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore {
        restaurants: sample_restaurants(),
        reviews: sample_reviews(),
    })
}

fn hybrid(retriever: Arc<dyn VectorRetriever>) -> HybridSearch {
    HybridSearch::new(store(), retriever, 30, 50)
}

/// A service whose LLM endpoint is unreachable: rewrite and AI scoring
/// must degrade, nothing may error.
fn service_without_llm(retriever: Arc<dyn VectorRetriever>) -> SearchService {
    let mut config = Config::default();
    config.llm = LlmConfig {
        provider: "openai".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        chat_model: "test".to_string(),
        embedding_model: "test".to_string(),
        api_key: None,
        embedding_dim: 8,
    };

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(250))
        .build()
        .unwrap();

    SearchService::new(
        client,
        Arc::new(RwLock::new(config.llm.clone())),
        store(),
        retriever,
        &config,
    )
}

// ─── Hybrid orchestrator ─────────────────────────────────

#[tokio::test]
async fn test_vector_outage_uses_keyword_fallback() {
    let hybrid = hybrid(Arc::new(FailingRetriever));
    let candidates = hybrid
        .execute("italian dinner", "italian dinner", &SearchFilters::default(), 3)
        .await
        .unwrap();

    assert!(!candidates.is_empty());
    assert!(candidates.len() <= 3);
    for c in &candidates {
        assert_eq!(c.vector_score, 0.0);
    }
    // Sorted descending by keyword score
    for pair in candidates.windows(2) {
        assert!(pair[0].keyword_score >= pair[1].keyword_score);
    }
    // The Italian places outrank the rest lexically
    assert!(candidates[0].restaurant.name.contains("Italian"));
}

#[tokio::test]
async fn test_empty_matches_use_keyword_fallback() {
    let hybrid = hybrid(Arc::new(StubRetriever { matches: vec![] }));
    let candidates = hybrid
        .execute("burgers", "burgers", &SearchFilters::default(), 9)
        .await
        .unwrap();

    assert!(!candidates.is_empty());
    assert!(candidates.iter().all(|c| c.vector_score == 0.0));
}

#[tokio::test]
async fn test_finalists_capped_at_nine() {
    let restaurants: Vec<Restaurant> = (0..15)
        .map(|i| restaurant(&format!("p{i}"), &format!("Place {i}"), &["Cafe"]))
        .collect();
    let matches: Vec<VectorMatch> = (0..15).map(|i| vm(&format!("p{i}"), 0.7)).collect();

    let hybrid = HybridSearch::new(
        Arc::new(InMemoryStore {
            restaurants,
            reviews: HashMap::new(),
        }),
        Arc::new(StubRetriever { matches }),
        30,
        50,
    );

    let candidates = hybrid
        .execute("cafe", "cafe", &SearchFilters::default(), 50)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 9);
}

#[tokio::test]
async fn test_candidate_scores_always_in_range() {
    let hybrid = hybrid(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let candidates = hybrid
        .execute("affordable Italian dinner", "affordable Italian dinner", &SearchFilters::default(), 9)
        .await
        .unwrap();

    for c in &candidates {
        assert!((0.0..=100.0).contains(&c.vector_score), "vector {}", c.vector_score);
        assert!((0.0..=100.0).contains(&c.keyword_score), "keyword {}", c.keyword_score);
        // Matched via vector search, so the mapped floor applies
        assert!(c.vector_score >= 50.0);
    }
}

#[tokio::test]
async fn test_affordable_italian_scenario() {
    // 12 matches spanning 5 unique restaurants; "Italian" in 2 names
    let hybrid = hybrid(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let candidates = hybrid
        .execute("affordable Italian dinner", "affordable Italian dinner", &SearchFilters::default(), 9)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 5);

    for id in ["p1", "p2"] {
        let c = candidates
            .iter()
            .find(|c| c.restaurant.place_id == id)
            .unwrap_or_else(|| panic!("{id} missing from finalists"));
        assert!(
            c.keyword_score >= 28.0,
            "{id} keyword score {} below name-match floor",
            c.keyword_score
        );
    }
}

#[tokio::test]
async fn test_enrichment_attaches_capped_reviews() {
    let hybrid = hybrid(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let candidates = hybrid
        .execute("pasta", "pasta", &SearchFilters::default(), 9)
        .await
        .unwrap();

    let p1 = candidates
        .iter()
        .find(|c| c.restaurant.place_id == "p1")
        .unwrap();
    // Store holds 10 reviews for p1; enrichment caps at 7
    assert_eq!(p1.reviews.len(), 7);

    let p3 = candidates
        .iter()
        .find(|c| c.restaurant.place_id == "p3")
        .unwrap();
    assert!(p3.reviews.is_empty());
}

#[tokio::test]
async fn test_filters_drop_candidates() {
    let hybrid = hybrid(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let filters = SearchFilters {
        cuisines: Some(vec!["italian".to_string()]),
        ..Default::default()
    };
    let candidates = hybrid
        .execute("dinner", "dinner", &filters, 9)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 2);
    assert!(candidates
        .iter()
        .all(|c| c.restaurant.cuisines.iter().any(|t| t == "Italian")));
}

// ─── Full service, degraded LLM ──────────────────────────

#[tokio::test]
async fn test_rewrite_failure_keeps_original_query() {
    let service = service_without_llm(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let response = service
        .search_restaurants("affordable Italian dinner", &SearchFilters::default(), 9)
        .await
        .unwrap();

    assert_eq!(response.query, "affordable Italian dinner");
    assert_eq!(response.rewritten_query, "affordable Italian dinner");
}

#[tokio::test]
async fn test_ai_scoring_failure_degrades_per_candidate() {
    let service = service_without_llm(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let response = service
        .search_restaurants("affordable Italian dinner", &SearchFilters::default(), 9)
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    for r in &response.results {
        assert_eq!(r.llm_reasoning, FALLBACK_REASONING);
        let expected = ((r.vector_score + r.keyword_score) / 2.0).round() as u8;
        assert_eq!(r.llm_score, expected);
        assert!(r.matched_criteria.is_empty());
    }
}

#[tokio::test]
async fn test_fused_ranking_and_metadata() {
    let service = service_without_llm(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let response = service
        .search_restaurants("affordable Italian dinner", &SearchFilters::default(), 3)
        .await
        .unwrap();

    assert!(response.results.len() <= 3);
    for pair in response.results.windows(2) {
        assert!(pair[0].ai_match_score >= pair[1].ai_match_score);
    }
    // One timing label per pipeline stage
    assert_eq!(response.steps.len(), 4);
    assert!(response.steps[0].starts_with("rewrite:"));
    assert!(response.steps[1].starts_with("hybrid:"));
}

#[tokio::test]
async fn test_vector_outage_end_to_end() {
    let service = service_without_llm(Arc::new(FailingRetriever));
    let response = service
        .search_restaurants("italian dinner", &SearchFilters::default(), 5)
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    for r in &response.results {
        assert_eq!(r.vector_score, 0.0);
    }
    // Keyword ordering survives fusion: both fused terms are monotone in
    // keyword score and the sort is stable
    for pair in response.results.windows(2) {
        assert!(pair[0].keyword_score >= pair[1].keyword_score);
    }
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let service = service_without_llm(Arc::new(StubRetriever {
        matches: sample_matches(),
    }));
    let response = service
        .search_restaurants("dinner", &SearchFilters::default(), 0)
        .await
        .unwrap();
    assert!(response.results.len() <= 1);
}

#[tokio::test]
async fn test_health_reports_degraded_llm() {
    let service = service_without_llm(Arc::new(StubRetriever { matches: vec![] }));
    let health = service.check_health().await;

    assert_eq!(health.datastore, "ok");
    assert_eq!(health.vector_index, "ok");
    assert!(health.llm.starts_with("error"));
    assert_eq!(health.status, "degraded");
}
