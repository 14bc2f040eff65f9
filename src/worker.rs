use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cache::{GuideCache, make_cache_key};
use crate::llm::GuideModel;
use crate::metrics::{CACHE_HITS, CACHE_MISSES};
use crate::models::GuideJob;

// Processes generation jobs from the queue one at a time
pub async fn generation_worker(
    mut rx: mpsc::Receiver<GuideJob>,
    model: Arc<dyn GuideModel>,
    cache: Arc<GuideCache>,
) {
    info!("generation worker started - processing jobs sequentially");

    while let Some(job) = rx.recv().await {
        let cache_key = make_cache_key(&job.request);

        if let Some(response) = cache.get(&cache_key) {
            CACHE_HITS.inc();
            debug!("cache hit");
            let _ = job.response_tx.send(Ok(response));
            continue;
        }
        CACHE_MISSES.inc();
        debug!("cache miss - calling model");

        let result = model.generate(&job.request).await;
        if let Ok(response) = &result {
            cache.insert(cache_key, response.clone());
        }

        // Handler may have timed out and dropped the receiver
        let _ = job.response_tx.send(result);
    }

    info!("generation worker stopped");
}
