use serde::{Deserialize, Serialize};

/// A restaurant row as returned by the data store.
///
/// Phase-1 metadata fetches leave the expensive fields (`opening_hours`,
/// `parking`, `popular_times`) empty; they are filled in during finalist
/// enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Restaurant {
    /// Stable external identifier (vendor place id).
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Cuisine/category tags, primary first.
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    /// Price level 1 (cheap) to 4 (expensive), if known.
    pub price_level: Option<u8>,
    /// Free-text price info, e.g. "R 150-250 per person".
    #[serde(default)]
    pub price_text: String,
    /// Service-option tags: "outdoor seating", "takeaway", "parking", ...
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub opening_hours: Vec<DayHours>,
    pub parking: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub popular_times: String,
}

/// Opening hours for one weekday, e.g. `{"day": "Monday", "hours": "9:00 AM to 10:00 PM"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHours {
    pub day: String,
    pub hours: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub author: String,
    pub rating: f32,
    pub text: String,
}

/// One nearest-neighbour hit from the vector index.
///
/// Transient: produced and consumed within a single retrieval call,
/// never persisted.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub place_id: String,
    /// Raw cosine-style similarity in [0, 1].
    pub similarity: f32,
    /// Which semantic chunk matched: "overview", "reviews", "features", ...
    pub chunk_type: String,
    pub chunk_content: String,
}

/// Optional constraints on a search. Unset fields impose no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    /// Match if any entry is a (case-insensitive) substring of any cuisine tag.
    pub cuisines: Option<Vec<String>>,
    pub price_min: Option<u8>,
    pub price_max: Option<u8>,
    /// Substring match against neighborhood or address.
    pub location: Option<String>,
    pub min_rating: Option<f32>,
    /// Every entry must substring-match one of the restaurant's feature tags.
    pub features: Option<Vec<String>>,
    /// Opt-in hard filter; applied to enriched finalists only, since
    /// opening hours are fetched during enrichment.
    #[serde(default)]
    pub open_now: bool,
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub fn default_limit() -> usize {
    9
}

/// Hard cap on the requested result count, enforced by the service.
pub const MAX_LIMIT: usize = 50;

/// A restaurant threaded through the pipeline with its retrieval scores.
///
/// Both scores are always in [0, 100]. A candidate that never matched
/// vector search has `vector_score == 0.0`.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub restaurant: Restaurant,
    pub vector_score: f32,
    pub keyword_score: f32,
    /// Chunk type of the best vector match, when one exists.
    pub matched_chunk: Option<String>,
    /// Empty until finalist enrichment.
    pub reviews: Vec<Review>,
}

impl Candidate {
    pub fn new(restaurant: Restaurant, vector_score: f32, keyword_score: f32) -> Self {
        Self {
            restaurant,
            vector_score,
            keyword_score,
            matched_chunk: None,
            reviews: Vec::new(),
        }
    }
}

/// A candidate after AI scoring and final fusion.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub restaurant: Restaurant,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub reviews: Vec<Review>,
    /// LLM match score in [0, 100], or the retrieval-derived fallback.
    pub llm_score: u8,
    pub llm_reasoning: String,
    pub matched_criteria: Vec<String>,
    pub missing_criteria: Vec<String>,
    pub key_strengths: Vec<String>,
    /// Final fused score; filled in by the search service.
    pub ai_match_score: u8,
    /// Computed from enriched opening hours; `None` when hours are absent.
    pub open_now: Option<bool>,
}

/// Search response: ranked candidates plus pipeline metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub rewritten_query: String,
    pub results: Vec<ScoredCandidate>,
    /// Ordered step-timing labels, e.g. `"rewrite: 120ms"`.
    pub steps: Vec<String>,
    pub took_ms: u64,
}

/// Per-sub-service availability report for GET /api/health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub datastore: String,
    pub vector_index: String,
    pub llm: String,
}
