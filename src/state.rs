use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::llm::LlmError;
use crate::models::{GenerateRequest, GenerateResponse, GuideJob};
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub job_tx: mpsc::Sender<GuideJob>,
    pub model: String,
    pub llm_timeout: Duration,
}

impl AppState {
    // Queue a prompt for the generation worker and wait for its answer
    pub async fn generate(&self, prompt: String) -> Result<GenerateResponse, LlmError> {
        let (response_tx, response_rx) = oneshot::channel();
        let job = GuideJob {
            request: GenerateRequest::new(&self.model, prompt),
            response_tx,
        };

        self.job_tx.send(job).await.map_err(|_| LlmError::WorkerGone)?;

        match tokio::time::timeout(self.llm_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(LlmError::WorkerGone),
            Err(_) => Err(LlmError::Timeout),
        }
    }
}
