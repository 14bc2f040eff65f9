use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::handlers::{explore_handler, health_handler, metrics_handler, packing_handler};
use crate::state::AppState;

pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/explore", post(explore_handler))
        .route("/api/packing/suggestions", post(packing_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GuideCache;
    use crate::llm::{GuideModel, LlmError};
    use crate::models::{GenerateRequest, GenerateResponse};
    use crate::rate_limit::{
        HitOutcome, MemoryStore, RateLimitConfig, RateLimitEntry, RateLimitError,
        RateLimitResult, RateLimitStore, RateLimiter,
    };
    use crate::worker::generation_worker;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, TimeDelta, Utc};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct CannedModel(String);

    #[async_trait]
    impl GuideModel for CannedModel {
        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
            Ok(GenerateResponse {
                model: request.model.clone(),
                response: self.0.clone(),
            })
        }
    }

    struct DownStore;

    #[async_trait]
    impl RateLimitStore for DownStore {
        async fn ensure_indexes(&self) -> RateLimitResult<()> {
            Ok(())
        }

        async fn get(&self, _id: &str) -> RateLimitResult<Option<RateLimitEntry>> {
            Err(RateLimitError::Unavailable("timed out".into()))
        }

        async fn hit(
            &self,
            _id: &str,
            _now: DateTime<Utc>,
            _window: TimeDelta,
            _limit: u32,
        ) -> RateLimitResult<HitOutcome> {
            Err(RateLimitError::Unavailable("timed out".into()))
        }
    }

    fn setup_app(model_output: &str, store: Arc<dyn RateLimitStore>) -> Router {
        let (job_tx, job_rx) = mpsc::channel(16);
        tokio::spawn(generation_worker(
            job_rx,
            Arc::new(CannedModel(model_output.to_string())),
            Arc::new(GuideCache::new(Duration::ZERO)),
        ));

        let config = RateLimitConfig {
            limit: 2,
            window: TimeDelta::hours(24),
        };
        build(Arc::new(AppState {
            rate_limiter: RateLimiter::new(store, config),
            job_tx,
            model: "llama3.2".to_string(),
            llm_timeout: Duration::from_secs(5),
        }))
    }

    fn explore_request(ip: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/explore")
            .header("content-type", "application/json")
            .header("referer", "https://trips.example/explore?mode=guest")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({
                    "query": "Jaipur",
                    "experience": "forts",
                    "dateRange": {"from": "2026-12-01", "to": "2026-12-04"}
                })
                .to_string(),
            ))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    const GUIDE: &str = "```json\n{\"weather\": \u{201C}Dry and sunny\u{201D}, \"attractions\": [\"Amber Fort\",],}\n```";

    #[tokio::test]
    async fn guest_guide_is_salvaged_and_carries_headers() {
        let app = setup_app(GUIDE, Arc::new(MemoryStore::new()));

        let response = app.oneshot(explore_request("198.51.100.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "1");
        assert!(response.headers().contains_key("x-ratelimit-reset"));
        let json = body_json(response).await;
        assert_eq!(json, json!({"weather": "Dry and sunny", "attractions": ["Amber Fort"]}));
    }

    #[tokio::test]
    async fn guest_over_limit_gets_429() {
        let app = setup_app(GUIDE, Arc::new(MemoryStore::new()));

        for _ in 0..2 {
            let response = app.clone().oneshot(explore_request("198.51.100.2")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.oneshot(explore_request("198.51.100.2")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        let reset_header: i64 = response.headers()["x-ratelimit-reset"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["error"], "Rate limit exceeded");
        assert_eq!(json["limit"], 2);
        assert_eq!(json["remaining"], 0);
        assert_eq!(json["reset"], reset_header);
    }

    #[tokio::test]
    async fn anonymous_without_guest_mode_is_unauthorized() {
        let app = setup_app(GUIDE, Arc::new(MemoryStore::new()));
        let request = Request::builder()
            .method("POST")
            .uri("/api/explore")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"query": "Goa", "dateRange": {"from": "a", "to": "b"}}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signed_in_user_is_not_counted() {
        let store = Arc::new(MemoryStore::new());
        let app = setup_app(GUIDE, store.clone());
        let mut request = explore_request("198.51.100.3");
        request
            .headers_mut()
            .insert("authorization", "Bearer session".parse().unwrap());

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unusable_model_output_is_a_500_with_headers() {
        let app = setup_app("I'm sorry, I can't plan that trip.", Arc::new(MemoryStore::new()));

        let response = app.oneshot(explore_request("198.51.100.4")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "1");
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid response format. Please try again.");
    }

    #[tokio::test]
    async fn literal_null_from_model_is_a_500() {
        let app = setup_app("null", Arc::new(MemoryStore::new()));

        let response = app.oneshot(explore_request("198.51.100.6")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid response format. Please try again.");
    }

    #[tokio::test]
    async fn store_outage_fails_closed() {
        let app = setup_app(GUIDE, Arc::new(DownStore));

        let response = app.oneshot(explore_request("198.51.100.5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn packing_suggestions_from_truncated_output() {
        let output = r#"{"items": [{"category": "documents", "name": "Passport", "quantity": 1}, {"category": "clothing", "name": "Jack"#;
        let app = setup_app(output, Arc::new(MemoryStore::new()));
        let request = Request::builder()
            .method("POST")
            .uri("/api/packing/suggestions?mode=guest")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"destination": "Leh", "startDate": "2026-06-01", "endDate": "2026-06-10"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            json!({"items": [{"name": "Passport", "category": "documents", "quantity": 1}]})
        );
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let app = setup_app(GUIDE, Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }
}
