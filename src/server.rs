use crate::cache::{warm_cursors, ItemCache};
use crate::config::Config;
use crate::handlers::{get_item_recipe, get_items_fuzzy, get_next_items, get_total_items, AppState};
use crate::middleware::{logging_middleware, rate_limit_middleware};
use crate::rate_limiter::RateLimiter;
use crate::recipe::RecipeResolver;
use crate::store::ItemStore;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Build the shared state: warm the page cache and the initial total.
///
/// Blocks on storage, so call it before the server starts accepting
/// connections (or from a blocking context).
pub fn build_state(config: &Config, store: Arc<dyn ItemStore>) -> crate::Result<AppState> {
    let cursors = warm_cursors(config.page_size, config.cached_pages);
    let cache = ItemCache::warm(&*store, config.page_size, &cursors)?;

    Ok(AppState {
        store,
        cache: Arc::new(cache),
        resolver: Arc::new(RecipeResolver::new(config.base_items.iter().copied())),
        limiter: RateLimiter::new(config.burst, config.rate_per_second),
        page_size: config.page_size,
        fuzzy_limit: config.fuzzy_limit,
        trust_proxy_headers: config.trust_proxy_headers,
    })
}

/// All routes. `/api/*` sits behind the per-client rate limiter.
pub fn create_app(state: AppState, html_dir: &Path) -> Router {
    let trust_proxy_headers = state.trust_proxy_headers;
    let api = Router::new()
        .route("/getTotalItems", get(get_total_items))
        .route("/getNextItems", get(get_next_items))
        .route("/getItemsFuzzy", get(get_items_fuzzy))
        .route("/getItemRecipe", get(get_item_recipe))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .route_service("/", ServeFile::new(html_dir.join("index.html")))
        .nest_service("/assets", ServeDir::new(html_dir.join("assets")))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(
                    trust_proxy_headers,
                    logging_middleware,
                )),
        )
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 Not Found")
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: &Config, state: AppState) -> Self {
        let app = create_app(state, &config.html_dir);
        Self {
            app,
            bind_addr: config.bind_addr,
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("Running webserver on {}", self.bind_addr);

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
