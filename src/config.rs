use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Vector index (nearest-neighbour) configuration
    pub vector: VectorIndexConfig,
    /// Restaurant data store configuration
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for rewriting and scoring
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

/// Configuration for the nearest-neighbour index (Pinecone-style HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Index endpoint base URL, e.g. "https://restaurants-abc123.svc.pinecone.io"
    pub base_url: String,
    pub api_key: Option<String>,
    /// Nearest-neighbour candidates fetched per query.
    pub top_k: usize,
}

/// Configuration for the restaurant data store (PostgREST-style HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// REST endpoint base URL, e.g. "http://localhost:3001/rest/v1"
    pub base_url: String,
    pub api_key: Option<String>,
    /// Page size for the keyword-only fallback fetch.
    pub fallback_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9100".to_string(),
            llm: LlmConfig::default(),
            vector: VectorIndexConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5080".to_string(),
            api_key: None,
            top_k: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/rest/v1".to_string(),
            api_key: None,
            fallback_page_size: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CHOW_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(url) = std::env::var("VECTOR_INDEX_URL") {
            config.vector.base_url = url;
        }
        if let Ok(key) = std::env::var("VECTOR_INDEX_API_KEY") {
            config.vector.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("VECTOR_INDEX_TOP_K") {
            if let Ok(v) = val.parse() {
                config.vector.top_k = v;
            }
        }
        if let Ok(url) = std::env::var("STORE_BASE_URL") {
            config.store.base_url = url;
        }
        if let Ok(key) = std::env::var("STORE_API_KEY") {
            config.store.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("STORE_FALLBACK_PAGE_SIZE") {
            if let Ok(v) = val.parse() {
                config.store.fallback_page_size = v;
            }
        }

        config
    }
}
