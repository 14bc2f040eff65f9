//! AI travel-guide gateway.
//!
//! Fronts Ollama backends with two AI endpoints (destination guides and
//! packing suggestions), caps anonymous "guest" use with a fixed-window rate
//! limiter backed by a shared counter store, and salvages JSON out of
//! whatever free text the model returns.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod json_repair;
pub mod llm;
pub mod load_balancer;
pub mod metrics;
pub mod models;
pub mod prompts;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod worker;
