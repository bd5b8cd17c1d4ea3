//! Restaurant data-store client.
//!
//! The relational store is an external collaborator; this module owns the
//! batched query/fetch contract the pipeline consumes. Every operation is
//! a single batched HTTP call — the orchestrator's two-phase strategy
//! (cheap metadata first, expensive detail for finalists only) depends on
//! these staying batched.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::StoreConfig;
use crate::models::{Restaurant, Review};

/// Columns that are cheap to fetch and sufficient for filtering/scoring.
const SUMMARY_COLUMNS: &str =
    "place_id,name,description,cuisines,neighborhood,address,rating,review_count,price_level,price_text,features";

#[async_trait]
pub trait RestaurantStore: Send + Sync {
    /// Lightweight metadata rows (no reviews, no hours) for the given ids.
    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<Restaurant>>;

    /// Full detail rows for the given ids.
    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<Restaurant>>;

    /// Up to `per_restaurant` reviews per id, keyed by place id.
    async fn fetch_reviews(
        &self,
        ids: &[String],
        per_restaurant: usize,
    ) -> Result<HashMap<String, Vec<Review>>>;

    /// A bounded page of restaurants, for the keyword-only fallback.
    async fn fetch_page(&self, limit: usize) -> Result<Vec<Restaurant>>;
}

/// PostgREST-style HTTP store client.
pub struct HttpRestaurantStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl HttpRestaurantStore {
    pub fn new(client: reqwest::Client, config: StoreConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => req
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }

    async fn fetch_restaurants(&self, ids: &[String], select: &str) -> Result<Vec<Restaurant>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .auth(self.client.get(self.url("restaurants")))
            .query(&[
                ("select", select.to_string()),
                ("place_id", in_clause(ids)),
            ])
            .send()
            .await
            .context("Failed to reach restaurant store")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Restaurant store returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse restaurant rows")
    }
}

/// Review row shape as stored: reviews live in their own table keyed by
/// place id.
#[derive(Deserialize)]
struct ReviewRow {
    place_id: String,
    #[serde(default)]
    author: String,
    rating: f32,
    text: String,
}

#[async_trait]
impl RestaurantStore for HttpRestaurantStore {
    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<Restaurant>> {
        self.fetch_restaurants(ids, SUMMARY_COLUMNS).await
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<Restaurant>> {
        self.fetch_restaurants(ids, "*").await
    }

    async fn fetch_reviews(
        &self,
        ids: &[String],
        per_restaurant: usize,
    ) -> Result<HashMap<String, Vec<Review>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let resp = self
            .auth(self.client.get(self.url("reviews")))
            .query(&[
                ("select", "place_id,author,rating,text".to_string()),
                ("place_id", in_clause(ids)),
                ("order", "rating.desc".to_string()),
            ])
            .send()
            .await
            .context("Failed to reach review store")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Review store returned {status}: {body}");
        }

        let rows: Vec<ReviewRow> = resp.json().await.context("Failed to parse review rows")?;

        // The REST layer cannot cap per-group, so enforce the per-restaurant
        // cap here.
        let mut grouped: HashMap<String, Vec<Review>> = HashMap::new();
        for row in rows {
            let entry = grouped.entry(row.place_id).or_default();
            if entry.len() < per_restaurant {
                entry.push(Review {
                    author: row.author,
                    rating: row.rating,
                    text: row.text,
                });
            }
        }
        Ok(grouped)
    }

    async fn fetch_page(&self, limit: usize) -> Result<Vec<Restaurant>> {
        let resp = self
            .auth(self.client.get(self.url("restaurants")))
            .query(&[("select", "*".to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .context("Failed to reach restaurant store")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Restaurant store returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse restaurant rows")
    }
}

/// PostgREST `in.(...)` filter clause for a batched id lookup.
fn in_clause(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("\"{id}\"")).collect();
    format!("in.({})", quoted.join(","))
}
