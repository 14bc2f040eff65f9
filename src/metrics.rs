use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, IntCounterVec, register_counter, register_gauge,
    register_histogram, register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("tripguide_requests_total", "Total number of AI requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("tripguide_cache_hits_total", "Total guide cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("tripguide_cache_misses_total", "Total guide cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("tripguide_cache_size", "Current number of cached model responses").unwrap();
    pub static ref LLM_LATENCY: Histogram = register_histogram!(
        "tripguide_llm_latency_seconds",
        "Model round trip latency in seconds"
    )
    .unwrap();
    pub static ref GUEST_CHECKS: IntCounterVec = register_int_counter_vec!(
        "tripguide_guest_checks_total",
        "Guest rate limit checks by result",
        &["result"]
    )
    .unwrap();
    pub static ref JSON_SALVAGE: IntCounterVec = register_int_counter_vec!(
        "tripguide_json_salvage_total",
        "Model output parse attempts by outcome",
        &["outcome"]
    )
    .unwrap();
}
