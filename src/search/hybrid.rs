//! Hybrid candidate gathering: vector retrieval + keyword scoring with a
//! two-phase fetch.
//!
//! Phase 1 pulls cheap metadata for every vector-matched restaurant and
//! scores it lexically; phase 2 pays the enrichment cost (full detail +
//! reviews) only for the top finalists. A vector-infrastructure outage
//! short-circuits into a keyword-only path fed straight from the data
//! store, so a search always produces candidates unless the store itself
//! is down.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::{Candidate, Restaurant, SearchFilters, VectorMatch};
use crate::search::hours::is_open_now;
use crate::search::keyword::{enhanced_score, keyword_score, searchable_text};
use crate::search::vector::{similarity_to_score, VectorRetriever};
use crate::store::RestaurantStore;

/// Hard cap on finalists forwarded to enrichment and AI scoring,
/// independent of the requested result limit.
pub const MAX_FINALISTS: usize = 9;

/// Reviews fetched per finalist during enrichment.
pub const REVIEWS_PER_RESTAURANT: usize = 7;

pub struct HybridSearch {
    store: Arc<dyn RestaurantStore>,
    retriever: Arc<dyn VectorRetriever>,
    /// Nearest-neighbour candidates fetched per query.
    top_k: usize,
    /// Restaurants fetched for the keyword-only fallback.
    fallback_limit: usize,
}

impl HybridSearch {
    pub fn new(
        store: Arc<dyn RestaurantStore>,
        retriever: Arc<dyn VectorRetriever>,
        top_k: usize,
        fallback_limit: usize,
    ) -> Self {
        Self {
            store,
            retriever,
            top_k,
            fallback_limit,
        }
    }

    /// Gather, filter, and enrich candidates for a query.
    ///
    /// Vector failure (or an empty match set) degrades to the keyword-only
    /// path; data-store failures propagate.
    pub async fn execute(
        &self,
        original_query: &str,
        rewritten_query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        // ── Step 1: vector retrieval (the one failure we catch) ──
        let matches = match self.retriever.search(rewritten_query, self.top_k).await {
            Ok(matches) if !matches.is_empty() => matches,
            Ok(_) => {
                tracing::info!("No vector matches; using keyword-only fallback");
                return self.keyword_fallback(original_query, filters, limit).await;
            }
            Err(e) => {
                tracing::warn!("Vector search failed: {e}; using keyword-only fallback");
                return self.keyword_fallback(original_query, filters, limit).await;
            }
        };

        // ── Step 2: collapse chunk matches to unique restaurants ──
        let deduped = dedupe_matches(&matches);
        let ids: Vec<String> = deduped.iter().map(|d| d.place_id.clone()).collect();
        tracing::info!(
            "{} vector matches over {} unique restaurants",
            matches.len(),
            ids.len()
        );

        // ── Step 3: phase-1 metadata fetch, one batched call ──
        let rows = self
            .store
            .fetch_summaries(&ids)
            .await
            .context("Failed to fetch candidate metadata")?;
        let mut by_id: HashMap<String, Restaurant> = rows
            .into_iter()
            .map(|r| (r.place_id.clone(), r))
            .collect();

        // ── Steps 4-5: combine vector + keyword scores, first-seen order ──
        let mut candidates: Vec<Candidate> = deduped
            .into_iter()
            .filter_map(|d| {
                let restaurant = by_id.remove(&d.place_id)?;
                let keyword = keyword_score(original_query, &restaurant, &[]);
                let mut candidate = Candidate::new(restaurant, d.vector_score, keyword);
                candidate.matched_chunk = Some(d.chunk_type);
                Some(candidate)
            })
            .collect();

        // ── Step 6: filters ──
        candidates.retain(|c| passes_filters(&c.restaurant, filters));

        // ── Step 7: phrase/term-coverage boost ──
        for candidate in &mut candidates {
            let text = searchable_text(&candidate.restaurant, &candidate.reviews);
            candidate.keyword_score =
                enhanced_score(candidate.keyword_score, original_query, &text);
        }

        // ── Step 8: keep only the finalists worth enriching ──
        candidates.sort_by(|a, b| {
            let left = b.vector_score + b.keyword_score;
            let right = a.vector_score + a.keyword_score;
            left.partial_cmp(&right).unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(MAX_FINALISTS);

        // ── Step 9: enrichment, two concurrent batched calls ──
        self.enrich(&mut candidates).await?;

        if filters.open_now {
            candidates.retain(|c| is_open_now(&c.restaurant.opening_hours));
        }

        Ok(candidates)
    }

    /// Backpressure valve for vector-infrastructure outages: a bounded
    /// page from the store, keyword-scored against the original query.
    async fn keyword_fallback(
        &self,
        original_query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let rows = self
            .store
            .fetch_page(self.fallback_limit)
            .await
            .context("Failed to fetch fallback restaurants")?;

        let mut candidates: Vec<Candidate> = rows
            .into_iter()
            .filter(|r| passes_filters(r, filters))
            .map(|r| {
                let keyword = keyword_score(original_query, &r, &[]);
                Candidate::new(r, 0.0, keyword)
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.keyword_score
                .partial_cmp(&a.keyword_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);

        if filters.open_now {
            candidates.retain(|c| is_open_now(&c.restaurant.opening_hours));
        }

        Ok(candidates)
    }

    /// Merge full detail rows and capped review lists onto the finalists.
    /// Store failure here is fatal: the pipeline cannot responsibly score
    /// candidates whose enrichment it half-finished.
    async fn enrich(&self, finalists: &mut [Candidate]) -> Result<()> {
        if finalists.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = finalists
            .iter()
            .map(|c| c.restaurant.place_id.clone())
            .collect();

        let (details, mut reviews) = tokio::try_join!(
            self.store.fetch_details(&ids),
            self.store.fetch_reviews(&ids, REVIEWS_PER_RESTAURANT),
        )
        .context("Failed to enrich finalists")?;

        let mut detail_by_id: HashMap<String, Restaurant> = details
            .into_iter()
            .map(|r| (r.place_id.clone(), r))
            .collect();

        for candidate in finalists.iter_mut() {
            let id = candidate.restaurant.place_id.clone();
            if let Some(detail) = detail_by_id.remove(&id) {
                candidate.restaurant = detail;
            }
            if let Some(list) = reviews.remove(&id) {
                candidate.reviews = list;
            }
        }

        Ok(())
    }
}

/// Per-restaurant best match after deduplication.
#[derive(Debug, Clone)]
pub struct DedupedMatch {
    pub place_id: String,
    /// Max similarity-derived score across the restaurant's chunk matches.
    pub vector_score: f32,
    /// Chunk type of the winning match.
    pub chunk_type: String,
}

/// Collapse chunk-level matches to unique restaurants, keeping the max
/// mapped score per restaurant. First-seen order is preserved; on a score
/// tie the earlier match's metadata wins.
pub fn dedupe_matches(matches: &[VectorMatch]) -> Vec<DedupedMatch> {
    let mut order: Vec<DedupedMatch> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for m in matches {
        let score = similarity_to_score(m.similarity);
        match index.get(&m.place_id) {
            Some(&i) => {
                if score > order[i].vector_score {
                    order[i].vector_score = score;
                    order[i].chunk_type = m.chunk_type.clone();
                }
            }
            None => {
                index.insert(m.place_id.clone(), order.len());
                order.push(DedupedMatch {
                    place_id: m.place_id.clone(),
                    vector_score: score,
                    chunk_type: m.chunk_type.clone(),
                });
            }
        }
    }

    order
}

/// Does this restaurant satisfy every specified filter? Unset filters
/// impose no constraint. `open_now` is handled separately, after hours
/// are available.
pub fn passes_filters(restaurant: &Restaurant, filters: &SearchFilters) -> bool {
    if let Some(cuisines) = &filters.cuisines {
        if !cuisines.is_empty() {
            let tags: Vec<String> = restaurant
                .cuisines
                .iter()
                .map(|c| c.to_lowercase())
                .collect();
            let any_match = cuisines.iter().any(|want| {
                let want = want.to_lowercase();
                tags.iter().any(|tag| tag.contains(&want))
            });
            if !any_match {
                return false;
            }
        }
    }

    // A restaurant with an unknown price level cannot satisfy a price bound
    if let Some(min) = filters.price_min {
        match restaurant.price_level {
            Some(level) if level >= min => {}
            _ => return false,
        }
    }
    if let Some(max) = filters.price_max {
        match restaurant.price_level {
            Some(level) if level <= max => {}
            _ => return false,
        }
    }

    if let Some(min_rating) = filters.min_rating {
        if restaurant.rating < min_rating {
            return false;
        }
    }

    if let Some(location) = &filters.location {
        let want = location.to_lowercase();
        if !want.is_empty()
            && !restaurant.neighborhood.to_lowercase().contains(&want)
            && !restaurant.address.to_lowercase().contains(&want)
        {
            return false;
        }
    }

    if let Some(features) = &filters.features {
        for want in features {
            let want = want.to_lowercase();
            if want.is_empty() {
                continue;
            }
            if !restaurant
                .features
                .iter()
                .any(|f| f.to_lowercase().contains(&want))
            {
                return false;
            }
        }
    }

    true
}
