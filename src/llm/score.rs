//! LLM relevance scoring of enriched candidates.
//!
//! One structured call per batch scores every candidate 0-100 against the
//! user's query, having read condensed review snippets. A candidate is
//! never dropped because scoring failed: anything the LLM misses falls
//! back to a score derived from its retrieval signals.

use std::collections::HashMap;
use std::fmt::Write;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::LlmConfig;
use crate::models::{Candidate, ScoredCandidate};

/// Candidates scored per LLM call. The orchestrator caps finalists at the
/// same number, so a search normally issues exactly one call.
pub const SCORING_BATCH_SIZE: usize = 9;

/// Reasoning attached when a candidate was scored from retrieval signals
/// instead of the LLM.
pub const FALLBACK_REASONING: &str = "Scored from search relevance";

const MAX_PROMPT_REVIEWS: usize = 7;
const REVIEW_SNIPPET_CHARS: usize = 60;

const SCORING_SYSTEM: &str = "You score how well each restaurant matches a diner's query. \
     Be generous but honest. Score 0-100 per restaurant: \
     85-100 great match, 70-84 good match, 55-69 fair match, \
     40-54 poor match, 0-39 no match. \
     Keep reasoning under 10 words. \
     Respond with ONLY a JSON object: {\"restaurantScores\": [{\"placeId\": \"...\", \
     \"score\": 0, \"reasoning\": \"...\", \"matchedCriteria\": [], \
     \"missingCriteria\": [], \"keyStrengths\": []}]}";

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    #[serde(rename = "restaurantScores")]
    restaurant_scores: Vec<RestaurantScore>,
}

#[derive(Debug, Deserialize)]
struct RestaurantScore {
    #[serde(rename = "placeId")]
    place_id: String,
    score: f32,
    #[serde(default)]
    reasoning: String,
    #[serde(rename = "matchedCriteria", default)]
    matched_criteria: Vec<String>,
    #[serde(rename = "missingCriteria", default)]
    missing_criteria: Vec<String>,
    #[serde(rename = "keyStrengths", default)]
    key_strengths: Vec<String>,
}

/// Score all candidates against the original query.
///
/// Batches of [`SCORING_BATCH_SIZE`]; a failed batch degrades every
/// candidate in it to the retrieval-derived fallback rather than erroring.
/// Match-back is by place id, never by response position.
pub async fn score_restaurants(
    client: &reqwest::Client,
    config: &LlmConfig,
    candidates: Vec<Candidate>,
    original_query: &str,
) -> Vec<ScoredCandidate> {
    let mut out = Vec::with_capacity(candidates.len());

    for batch in candidates.chunks(SCORING_BATCH_SIZE) {
        let scores = match score_batch(client, config, batch, original_query).await {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!("AI scoring failed for batch of {}: {e}", batch.len());
                HashMap::new()
            }
        };

        for candidate in batch {
            let score = scores.get(&candidate.restaurant.place_id);
            out.push(apply_score(candidate.clone(), score));
        }
    }

    out
}

async fn score_batch(
    client: &reqwest::Client,
    config: &LlmConfig,
    batch: &[Candidate],
    original_query: &str,
) -> Result<HashMap<String, RestaurantScore>> {
    let user = build_scoring_prompt(batch, original_query);

    let resp: ScoringResponse =
        crate::llm::structured::call_structured(client, config, SCORING_SYSTEM, &user)
            .await
            .context("Scoring call failed")?;

    Ok(resp
        .restaurant_scores
        .into_iter()
        .map(|s| (s.place_id.clone(), s))
        .collect())
}

fn apply_score(candidate: Candidate, score: Option<&RestaurantScore>) -> ScoredCandidate {
    let (llm_score, reasoning, matched, missing, strengths) = match score {
        Some(s) => (
            s.score.round().clamp(0.0, 100.0) as u8,
            s.reasoning.clone(),
            s.matched_criteria.clone(),
            s.missing_criteria.clone(),
            s.key_strengths.clone(),
        ),
        None => (
            heuristic_score(&candidate),
            FALLBACK_REASONING.to_string(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        ),
    };

    ScoredCandidate {
        restaurant: candidate.restaurant,
        vector_score: candidate.vector_score,
        keyword_score: candidate.keyword_score,
        reviews: candidate.reviews,
        llm_score,
        llm_reasoning: reasoning,
        matched_criteria: matched,
        missing_criteria: missing,
        key_strengths: strengths,
        ai_match_score: 0,
        open_now: None,
    }
}

/// Retrieval-derived stand-in when the LLM never scored this candidate.
fn heuristic_score(candidate: &Candidate) -> u8 {
    ((candidate.vector_score + candidate.keyword_score) / 2.0).round() as u8
}

/// One line of facts plus condensed review snippets per candidate.
fn build_scoring_prompt(batch: &[Candidate], original_query: &str) -> String {
    let mut prompt = format!("Diner's query: {original_query}\n\nRestaurants:\n");

    for candidate in batch {
        let r = &candidate.restaurant;
        let price = match r.price_level {
            Some(level) => "R".repeat(level as usize),
            None => "?".to_string(),
        };

        write!(
            prompt,
            "[{}] {} — {} | {:.1} stars ({} reviews) | price {}",
            r.place_id,
            r.name,
            r.cuisines.join(", "),
            r.rating,
            r.review_count,
            price,
        )
        .unwrap();
        if !r.features.is_empty() {
            write!(prompt, " | {}", r.features.join(", ")).unwrap();
        }
        prompt.push('\n');

        let snippets: Vec<String> = candidate
            .reviews
            .iter()
            .take(MAX_PROMPT_REVIEWS)
            .map(|review| {
                format!(
                    "({}/5) \"{}\"",
                    review.rating.round() as u8,
                    snippet(&review.text)
                )
            })
            .collect();
        if !snippets.is_empty() {
            writeln!(prompt, "  Reviews: {}", snippets.join(" | ")).unwrap();
        }
    }

    prompt
}

/// Truncate review text to a short snippet on a char boundary.
fn snippet(text: &str) -> String {
    if text.len() <= REVIEW_SNIPPET_CHARS {
        return text.to_string();
    }
    let cut: String = text
        .char_indices()
        .take_while(|(i, _)| *i < REVIEW_SNIPPET_CHARS)
        .map(|(_, c)| c)
        .collect();
    format!("{cut}...")
}
