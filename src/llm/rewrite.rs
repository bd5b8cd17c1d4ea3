//! LLM query rewriting for embedding-based retrieval.
//!
//! A raw query like "cheap date spot" retrieves poorly against rich
//! restaurant-chunk text; the rewriter expands it with implicit
//! requirements and synonyms before embedding. Failure here is silent:
//! callers always get a usable query back.

use anyhow::Result;
use serde::Deserialize;

use crate::config::LlmConfig;
use crate::llm::structured::{call_structured, chat};

const REWRITE_SYSTEM: &str = "You rewrite restaurant search queries for semantic retrieval. \
     Expand implicit requirements (e.g. \"date spot\" implies romantic atmosphere, \
     good service), add synonyms and related context terms, and preserve every \
     explicit constraint (price, cuisine, location, timing). Keep the rewrite \
     under 100 words. \
     Respond with ONLY a JSON object: {\"rewrittenQuery\": \"...\", \
     \"reasoning\": \"...\", \"keyTerms\": [\"...\"]}";

const KEY_TERMS_SYSTEM: &str = "Extract up to 5 key search terms from the restaurant query. \
     Respond with ONLY the terms, comma-separated. No explanation.";

/// Maximum key terms returned by either the LLM or the local fallback.
const MAX_KEY_TERMS: usize = 5;

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    #[serde(rename = "rewrittenQuery")]
    rewritten_query: String,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
    #[serde(rename = "keyTerms", default)]
    #[allow(dead_code)]
    key_terms: Vec<String>,
}

/// Rewrite a query for retrieval. One attempt, no retry; any failure
/// (network, timeout, malformed structured response) returns the
/// original query unchanged. Callers must not assume the result differs
/// from the input.
pub async fn rewrite_query(
    client: &reqwest::Client,
    config: &LlmConfig,
    query: &str,
) -> String {
    match call_structured::<RewriteResponse>(client, config, REWRITE_SYSTEM, query).await {
        Ok(resp) if !resp.rewritten_query.trim().is_empty() => {
            tracing::info!("Query rewritten: {:?} -> {:?}", query, resp.rewritten_query);
            resp.rewritten_query
        }
        Ok(_) => {
            tracing::warn!("Query rewrite returned an empty query; keeping original");
            query.to_string()
        }
        Err(e) => {
            tracing::warn!("Query rewrite failed: {e}; keeping original");
            query.to_string()
        }
    }
}

/// Extract key terms via a simpler comma-separated LLM call, falling back
/// to a local whitespace tokenizer.
pub async fn extract_key_terms(
    client: &reqwest::Client,
    config: &LlmConfig,
    query: &str,
) -> Vec<String> {
    match llm_key_terms(client, config, query).await {
        Ok(terms) if !terms.is_empty() => terms,
        Ok(_) => fallback_key_terms(query),
        Err(e) => {
            tracing::warn!("Key term extraction failed: {e}; using local tokenizer");
            fallback_key_terms(query)
        }
    }
}

async fn llm_key_terms(
    client: &reqwest::Client,
    config: &LlmConfig,
    query: &str,
) -> Result<Vec<String>> {
    let content = chat(client, config, KEY_TERMS_SYSTEM, query, false).await?;
    Ok(parse_key_terms(&content))
}

fn parse_key_terms(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .take(MAX_KEY_TERMS)
        .collect()
}

/// Local fallback: up to 5 whitespace-separated words longer than 2 chars.
pub fn fallback_key_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .take(MAX_KEY_TERMS)
        .collect()
}
