//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down credential
//! stuffing and refresh storms.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;
use crate::envelope::Envelope;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const SIGN_IN_PER_SEC: NonZeroU32 = NonZeroU32::new(10).unwrap();
const SIGN_IN_BURST: NonZeroU32 = NonZeroU32::new(20).unwrap();
const REFRESH_PER_SEC: NonZeroU32 = NonZeroU32::new(10).unwrap();
const REFRESH_BURST: NonZeroU32 = NonZeroU32::new(30).unwrap();

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Shared by login and register
    pub sign_in: Arc<IpLimiter>,
    pub refresh: Arc<IpLimiter>,
    /// Use `X-Forwarded-For` for the client key
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    pub fn new(trust_proxy: bool) -> Self {
        Self {
            sign_in: Arc::new(RateLimiter::keyed(
                Quota::per_second(SIGN_IN_PER_SEC).allow_burst(SIGN_IN_BURST),
            )),
            refresh: Arc::new(RateLimiter::keyed(
                Quota::per_second(REFRESH_PER_SEC).allow_burst(REFRESH_BURST),
            )),
            trust_proxy,
        }
    }
}

fn too_many_requests(message: &str) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(Envelope::<()>::failure(
            StatusCode::TOO_MANY_REQUESTS.as_u16(),
            message,
        )),
    )
        .into_response()
}

/// Middleware for rate limiting login and register.
pub async fn rate_limit_sign_in(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, config.trust_proxy);

    match config.sign_in.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Sign-in rate limit exceeded");
            too_many_requests("Too many sign-in attempts. Please wait before trying again.")
        }
    }
}

/// Middleware for rate limiting token refresh.
pub async fn rate_limit_refresh(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, config.trust_proxy);

    match config.refresh.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Refresh rate limit exceeded");
            too_many_requests("Too many requests. Please try again later.")
        }
    }
}
