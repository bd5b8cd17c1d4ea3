//! # chow-search
//!
//! A restaurant-discovery search service: given a free-text query, it
//! produces a ranked candidate list by combining semantic (vector)
//! retrieval, lexical (keyword) scoring, and an LLM relevance pass, then
//! fusing the three signals into one ranking.
//!
//! ## Architecture
//!
//! The pipeline is linear; each stage degrades independently:
//!
//! ```text
//!                    ┌──────────────┐
//!                    │  User Query   │
//!                    └──────┬────────┘
//!                           ▼
//!               ┌───────────────────────┐
//!               │   LLM Query Rewrite    │──fail──▶ original query
//!               └───────────┬───────────┘
//!                           ▼
//!               ┌───────────────────────┐
//!               │  Vector Search (k=30)  │──fail/empty──┐
//!               └───────────┬───────────┘               │
//!                           │ dedupe by restaurant,     ▼
//!                           │ max score per place   ┌──────────────────┐
//!                           ▼                       │ Keyword-only      │
//!               ┌───────────────────────┐           │ fallback (store   │
//!               │  Metadata Fetch        │           │ page, keyword     │
//!               │  + Keyword Scoring     │           │ sort, top limit)  │
//!               │  + Filters + Boost     │           └────────┬─────────┘
//!               └───────────┬───────────┘                    │
//!                           │ top 9 finalists                │
//!                           ▼                                │
//!               ┌───────────────────────┐                    │
//!               │  Enrichment            │                    │
//!               │  (details ∥ reviews)   │                    │
//!               └───────────┬───────────┘                    │
//!                           ▼                                │
//!               ┌───────────────────────┐                    │
//!               │  AI Scoring (batch 9)  │◀───────────────────┘
//!               │  fail → (v+k)/2        │
//!               └───────────┬───────────┘
//!                           ▼
//!               ┌───────────────────────┐
//!               │  Weighted Fusion       │
//!               │  0.20v + 0.15k + 0.65l │
//!               └───────────┬───────────┘
//!                           ▼
//!               ┌───────────────────────┐
//!               │  Sort + Limit          │
//!               └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, store, index, and LLM settings
//! - [`models`] - Shared data types: `Restaurant`, `Candidate`, `ScoredCandidate`, request/response types
//! - [`store`] - Batched restaurant/review fetches against the data store
//! - [`search::vector`] - Nearest-neighbour index client and similarity-to-score mapping
//! - [`search::keyword`] - Field-weighted lexical scoring with plural/singular tolerance
//! - [`search::hybrid`] - Two-phase candidate gathering with keyword-only fallback
//! - [`search::hours`] - Opening-hours parsing and open-now determination
//! - [`llm::rewrite`] - LLM query rewriting with silent degradation
//! - [`llm::score`] - Batched LLM relevance scoring with per-candidate fallback
//! - [`llm::embeddings`] - Query embedding via Ollama or OpenAI-compatible APIs
//! - [`service`] - Top-level pipeline coordination, score fusion, suggestions, health
//! - [`api`] - Axum HTTP handlers for search, suggestions, and health
//! - [`state`] - Shared application state wiring collaborators together

pub mod api;
pub mod config;
pub mod llm;
pub mod models;
pub mod search;
pub mod service;
pub mod state;
pub mod store;
