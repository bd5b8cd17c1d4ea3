use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use chow_search::api;
use chow_search::config::Config;
use chow_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!("Vector index: {}", config.vector.base_url);
    tracing::info!("Restaurant store: {}", config.store.base_url);

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/api/search", post(api::search::search))
        .route("/api/search/suggestions", get(api::search::suggestions))
        .route("/api/health", get(api::search::health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
