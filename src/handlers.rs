use axum::extract::{Query, State};
use serde::Deserialize;
use std::sync::Arc;

use crate::cache::{self, ItemCache};
use crate::error::{ApiError, Result};
use crate::rate_limiter::RateLimiter;
use crate::recipe::RecipeResolver;
use crate::response::JsonBytes;
use crate::store::ItemStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub cache: Arc<ItemCache>,
    pub resolver: Arc<RecipeResolver>,
    pub limiter: RateLimiter,
    pub page_size: usize,
    pub fuzzy_limit: usize,
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Deserialize)]
pub struct NextItemsParams {
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FuzzyParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct RecipeParams {
    pub item: Option<String>,
}

fn parse_id(raw: Option<&str>, name: &str) -> Result<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::InvalidParameter(format!("Invalid {} parameter", name)))
}

/// Run a blocking storage call off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// `GET /api/getTotalItems`
pub async fn get_total_items(State(state): State<AppState>) -> JsonBytes {
    JsonBytes(state.cache.total())
}

/// `GET /api/getNextItems?after=<id>`
pub async fn get_next_items(
    State(state): State<AppState>,
    Query(params): Query<NextItemsParams>,
) -> Result<JsonBytes> {
    let after_id = parse_id(params.after.as_deref(), "after")?;

    if let Some(page) = state.cache.page(after_id) {
        return Ok(JsonBytes(page));
    }

    let store = Arc::clone(&state.store);
    let page_size = state.page_size;
    let page = blocking(move || cache::render_page(&*store, page_size, after_id)).await?;
    Ok(JsonBytes(page))
}

/// `GET /api/getItemsFuzzy?query=<text>`
pub async fn get_items_fuzzy(
    State(state): State<AppState>,
    Query(params): Query<FuzzyParams>,
) -> Result<JsonBytes> {
    let store = Arc::clone(&state.store);
    let limit = state.fuzzy_limit;
    let body = blocking(move || {
        let items = store.items_by_fuzzy_name(&params.query, limit)?;
        Ok(serde_json::to_vec(&items)?)
    })
    .await?;
    Ok(body.into())
}

/// `GET /api/getItemRecipe?item=<id>`
pub async fn get_item_recipe(
    State(state): State<AppState>,
    Query(params): Query<RecipeParams>,
) -> Result<JsonBytes> {
    let item_id = parse_id(params.item.as_deref(), "item")?;

    let store = Arc::clone(&state.store);
    let resolver = Arc::clone(&state.resolver);
    let body = blocking(move || {
        let tree = resolver.resolve(&*store, item_id)?;
        Ok(serde_json::to_vec(&tree)?)
    })
    .await?;
    Ok(body.into())
}
