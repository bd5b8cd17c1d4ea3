use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::Config;
use crate::search::vector::HttpVectorRetriever;
use crate::service::SearchService;
use crate::store::HttpRestaurantStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<SearchService>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let llm_config = Arc::new(RwLock::new(config.llm.clone()));
        let store = Arc::new(HttpRestaurantStore::new(
            http_client.clone(),
            config.store.clone(),
        ));
        let retriever = Arc::new(HttpVectorRetriever::new(
            http_client.clone(),
            llm_config.clone(),
            config.vector.clone(),
        ));

        let service = Arc::new(SearchService::new(
            http_client,
            llm_config,
            store,
            retriever,
            &config,
        ));

        Ok(Self { config, service })
    }
}
