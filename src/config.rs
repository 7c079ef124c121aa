use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::recipe::DEFAULT_BASE_ITEMS;

/// Crafting catalog API server.
///
/// Every option can also be set through the environment variable shown.
#[derive(Debug, Clone, Parser, Validate)]
#[command(name = "crafting-api", version, about)]
pub struct Config {
    /// Address to serve on
    #[arg(long = "addr", env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
    pub bind_addr: SocketAddr,

    /// SQLite item database
    #[arg(long = "db", env = "ITEMS_DB", default_value = "Items.db")]
    pub db_path: PathBuf,

    /// Directory holding index.html and assets/
    #[arg(long, env = "HTML_DIR", default_value = "./html")]
    pub html_dir: PathBuf,

    /// Tokens added to each client bucket per second
    #[arg(long, env = "RATE_PER_SECOND", default_value_t = 1.0)]
    #[validate(range(exclusive_min = 0.0))]
    pub rate_per_second: f64,

    /// Client bucket capacity
    #[arg(long, env = "RATE_BURST", default_value_t = 10)]
    #[validate(range(min = 1))]
    pub burst: u32,

    /// Evict client buckets idle this long (0 keeps them forever)
    #[arg(long, env = "LIMITER_IDLE_SECS", default_value_t = 0)]
    pub limiter_idle_secs: u64,

    /// How often idle buckets are swept
    #[arg(long, env = "LIMITER_SWEEP_SECS", default_value_t = 300)]
    #[validate(range(min = 1))]
    pub limiter_sweep_secs: u64,

    /// Interval between total item count refreshes
    #[arg(long, env = "TOTAL_REFRESH_SECS", default_value_t = 60)]
    #[validate(range(min = 1))]
    pub total_refresh_secs: u64,

    /// Items per getNextItems page
    #[arg(long, env = "PAGE_SIZE", default_value_t = 1000)]
    #[validate(range(min = 1))]
    pub page_size: usize,

    /// Pages cached at startup
    #[arg(long, env = "CACHED_PAGES", default_value_t = 10)]
    pub cached_pages: usize,

    /// Maximum getItemsFuzzy results
    #[arg(long, env = "FUZZY_LIMIT", default_value_t = 50)]
    #[validate(range(min = 1))]
    pub fuzzy_limit: usize,

    /// Item ids never decomposed in recipe trees
    #[arg(long, env = "BASE_ITEMS", value_delimiter = ',', default_value = "1,2,3,4")]
    pub base_items: Vec<i64>,

    /// Key clients by X-Forwarded-For / X-Real-IP instead of the peer address
    #[arg(long, env = "TRUST_PROXY_HEADERS")]
    pub trust_proxy_headers: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parse flags and environment, then validate.
    pub fn load() -> Result<Self, validator::ValidationErrors> {
        let config = Config::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn total_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.total_refresh_secs)
    }

    /// `None` when idle eviction is disabled.
    pub fn limiter_idle_timeout(&self) -> Option<Duration> {
        (self.limiter_idle_secs > 0).then(|| Duration::from_secs(self.limiter_idle_secs))
    }

    pub fn limiter_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.limiter_sweep_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: PathBuf::from("Items.db"),
            html_dir: PathBuf::from("./html"),
            rate_per_second: 1.0,
            burst: 10,
            limiter_idle_secs: 0,
            limiter_sweep_secs: 300,
            total_refresh_secs: 60,
            page_size: 1000,
            cached_pages: 10,
            fuzzy_limit: 50,
            base_items: DEFAULT_BASE_ITEMS.to_vec(),
            trust_proxy_headers: false,
            log_level: "info".to_string(),
        }
    }
}
