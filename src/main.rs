use chrono::TimeDelta;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trip_guide_gateway::cache::{GuideCache, cache_sweeper};
use trip_guide_gateway::config::Args;
use trip_guide_gateway::llm::OllamaModel;
use trip_guide_gateway::load_balancer::{LoadBalancer, health_checker};
use trip_guide_gateway::models::GuideJob;
use trip_guide_gateway::rate_limit::{
    MemoryStore, RateLimitConfig, RateLimitStore, RateLimiter, reaper,
};
use trip_guide_gateway::router;
use trip_guide_gateway::state::AppState;
use trip_guide_gateway::worker::generation_worker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let rate_limiter = RateLimiter::new(
        counter_store(&args).await,
        RateLimitConfig {
            limit: args.guest_limit,
            window: TimeDelta::try_seconds(args.guest_window)
                .expect("guest window bounded by the CLI parser"),
        },
    );
    // An unreachable store is logged here and surfaces as 503s on guest requests
    if let Err(e) = rate_limiter.ensure_indexes().await {
        error!(error = %e, "failed to initialize rate limit store");
    }

    let client = reqwest::Client::new();
    let load_balancer =
        Arc::new(LoadBalancer::new(&args.backends).expect("at least one backend required"));
    tokio::spawn(health_checker(
        load_balancer.clone(),
        client.clone(),
        Duration::from_secs(args.health_interval),
    ));

    let llm_timeout = Duration::from_secs(args.llm_timeout);
    let model = Arc::new(OllamaModel::new(client, load_balancer, llm_timeout));
    let cache = Arc::new(GuideCache::new(Duration::from_secs(args.cache_ttl)));
    tokio::spawn(cache_sweeper(
        cache.clone(),
        Duration::from_secs(args.reap_interval),
    ));
    let (job_tx, job_rx) = mpsc::channel::<GuideJob>(100);
    tokio::spawn(generation_worker(job_rx, model, cache));

    let state = Arc::new(AppState {
        rate_limiter,
        job_tx,
        model: args.model.clone(),
        llm_timeout,
    });
    let app = router::build(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    info!("Gateway running on http://localhost:{}", args.port);
    info!("Model: {} (cache TTL {}s)", args.model, args.cache_ttl);
    info!(
        "Guest limit: {} requests per {} seconds",
        args.guest_limit, args.guest_window
    );
    axum::serve(listener, app).await.expect("Server failed");
}

// Redis when configured, otherwise process memory swept by a reaper task
async fn counter_store(args: &Args) -> Arc<dyn RateLimitStore> {
    if let Some(store) = shared_store(args).await {
        return store;
    }

    let store = Arc::new(MemoryStore::new());
    tokio::spawn(reaper(store.clone(), Duration::from_secs(args.reap_interval)));
    info!("guest counters kept in process memory");
    store
}

#[cfg(feature = "redis-backend")]
async fn shared_store(args: &Args) -> Option<Arc<dyn RateLimitStore>> {
    use trip_guide_gateway::rate_limit::RedisStore;

    let url = args.redis_url.as_deref()?;
    match RedisStore::connect(url).await {
        Ok(store) => {
            info!("guest counters kept in Redis");
            Some(Arc::new(store))
        }
        Err(e) => {
            error!(error = %e, "redis unreachable, falling back to in-process counters");
            None
        }
    }
}

#[cfg(not(feature = "redis-backend"))]
async fn shared_store(_args: &Args) -> Option<Arc<dyn RateLimitStore>> {
    None
}
