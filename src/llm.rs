//! Model access: the `GuideModel` seam and its Ollama implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::load_balancer::LoadBalancer;
use crate::metrics::LLM_LATENCY;
use crate::models::{GenerateRequest, GenerateResponse};

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("no backends configured")]
    NoBackendsConfigured,
    #[error("no healthy backends available")]
    NoHealthyBackend,
    #[error("model call timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("generation worker unavailable")]
    WorkerGone,
}

/// Anything that can turn a prompt into raw model text.
#[async_trait]
pub trait GuideModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

/// Ollama `/api/generate` over the load-balanced backend pool.
pub struct OllamaModel {
    client: reqwest::Client,
    load_balancer: Arc<LoadBalancer>,
    timeout: Duration,
}

impl OllamaModel {
    pub fn new(client: reqwest::Client, load_balancer: Arc<LoadBalancer>, timeout: Duration) -> Self {
        Self {
            client,
            load_balancer,
            timeout,
        }
    }
}

#[async_trait]
impl GuideModel for OllamaModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let backend = self
            .load_balancer
            .get_backend()
            .ok_or(LlmError::NoHealthyBackend)?;
        debug!(backend = %backend.url, model = %request.model, "calling model");

        let start = Instant::now();
        let result = self
            .client
            .post(format!("{}/api/generate", backend.url))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await;

        let response = match result {
            Ok(res) => res,
            Err(e) if e.is_timeout() => return Err(LlmError::Timeout),
            // Marking backend as unhealthy until the health checker says otherwise
            Err(e) => {
                backend.set_healthy(false);
                warn!(backend = %backend.url, error = %e, "backend failed, marked unhealthy");
                return Err(LlmError::Request(e.to_string()));
            }
        };

        let response = response
            .error_for_status()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let body = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        LLM_LATENCY.observe(start.elapsed().as_secs_f64());
        Ok(body)
    }
}
