//! Who is calling: a signed-in user, a rate-limited guest, or nobody allowed.
//!
//! Signature verification happens upstream; a request that reaches us with an
//! `Authorization` header is treated as signed in. Guests are keyed by the
//! address the proxy reports, which a client can spoof. That is accepted: the
//! guest cap is an abuse deterrent, not a security boundary.

use axum::http::{HeaderMap, Uri, header};
use axum::response::Response;

use crate::error::{AppError, Result};
use crate::metrics::GUEST_CHECKS;
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

const GUEST_MARKER: &str = "mode=guest";
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    SignedIn,
    Guest(RateLimitDecision),
}

impl Access {
    /// Attach the guest's rate limit headers, whatever the outcome of the request.
    pub fn decorate(&self, mut response: Response) -> Response {
        if let Access::Guest(decision) = self {
            decision.write_headers(response.headers_mut());
        }
        response
    }
}

pub fn is_guest_request(headers: &HeaderMap, uri: &Uri) -> bool {
    let from_referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|referer| referer.contains(GUEST_MARKER));
    let from_query = uri.query().is_some_and(|q| q.contains(GUEST_MARKER));
    from_referer || from_query
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then `anonymous`.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded.or(real_ip).unwrap_or(ANONYMOUS).to_string()
}

/// Admit the request or explain why not. Guests consume one unit of quota.
pub async fn authorize(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Result<Access> {
    if headers.contains_key(header::AUTHORIZATION) {
        return Ok(Access::SignedIn);
    }
    if !is_guest_request(headers, uri) {
        return Err(AppError::Unauthorized);
    }

    let identifier = client_identifier(headers);
    let decision = match state.rate_limiter.check_rate_limit(&identifier).await {
        Ok(decision) => decision,
        Err(e) => {
            GUEST_CHECKS.with_label_values(&["error"]).inc();
            return Err(e.into());
        }
    };

    if !decision.allowed {
        GUEST_CHECKS.with_label_values(&["rejected"]).inc();
        tracing::info!(identifier = %identifier, reset = decision.reset_millis(), "guest rate limit exceeded");
        return Err(AppError::RateLimited(decision));
    }

    GUEST_CHECKS.with_label_values(&["allowed"]).inc();
    Ok(Access::Guest(decision))
}
