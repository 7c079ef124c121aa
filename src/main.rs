use anyhow::Result;
use crafting_api::config::Config;
use crafting_api::server::{build_state, Server};
use crafting_api::store::{ItemStore, SqliteStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("crafting_api={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Loading database: {}", config.db_path.display());
    let store: Arc<dyn ItemStore> = Arc::new(
        SqliteStore::open(&config.db_path)
            .map_err(|e| anyhow::anyhow!("Failed to load database: {}", e))?,
    );

    let state = {
        let config = config.clone();
        let store = Arc::clone(&store);
        tokio::task::spawn_blocking(move || build_state(&config, store))
            .await?
            .map_err(|e| anyhow::anyhow!("Failed to initialize API: {}", e))?
    };
    tracing::info!(
        cached_pages = state.cache.cached_cursors().len(),
        base_items = ?config.base_items,
        "API initialized"
    );

    state
        .cache
        .spawn_total_refresh(Arc::clone(&store), config.total_refresh_interval());

    if let Some(max_idle) = config.limiter_idle_timeout() {
        state
            .limiter
            .spawn_sweeper(config.limiter_sweep_interval(), max_idle);
    }

    let server = Server::new(&config, state);
    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
