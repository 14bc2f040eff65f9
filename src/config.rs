use clap::Parser;

use crate::rate_limit::{DEFAULT_GUEST_LIMIT, DEFAULT_GUEST_WINDOW_SECS, MAX_GUEST_WINDOW_SECS};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "trip-guide-gateway")]
#[command(about = "AI travel guide gateway with guest-mode rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Ollama backends (comma-separated)
    // Example: "localhost:11434,localhost:11435"
    #[arg(short, long, env = "OLLAMA_BACKENDS", default_value = "localhost:11434")]
    pub backends: String,

    // Model used for guides and packing lists
    #[arg(short, long, env = "OLLAMA_MODEL", default_value = "llama3.2")]
    pub model: String,

    // Guide cache TTL in seconds
    #[arg(short, long, default_value_t = 300)]
    pub cache_ttl: u64,

    // Guest requests allowed per window
    #[arg(long, default_value_t = DEFAULT_GUEST_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
    pub guest_limit: u32,

    // Guest window length in seconds
    #[arg(long, default_value_t = DEFAULT_GUEST_WINDOW_SECS, value_parser = clap::value_parser!(i64).range(1..=MAX_GUEST_WINDOW_SECS))]
    pub guest_window: i64,

    // Shared counter store; counters stay in process memory when unset
    #[cfg(feature = "redis-backend")]
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    // Sweep interval for expired in-memory counters and stale cache entries, seconds
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub reap_interval: u64,

    // Health check interval, seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub health_interval: u64,

    // Upper bound on one model call, seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub llm_timeout: u64,
}
