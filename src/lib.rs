pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod recipe;
pub mod response;
pub mod server;
pub mod store;
pub mod token_bucket;

pub use config::Config;
pub use error::{ApiError, Result};
pub use handlers::AppState;
pub use server::{build_state, create_app};
