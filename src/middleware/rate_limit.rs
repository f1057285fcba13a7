use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-second window shared by every request on a router surface.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Mutex::new(WindowState {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut guard = self.window.lock().unwrap_or_else(|e| e.into_inner());
        if now.duration_since(guard.start) >= Duration::from_secs(1) {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            true
        } else {
            false
        }
    }

    fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.allow() {
        tracing::warn!(path = %req.uri().path(), limit = state.rps, "rate limit exceeded");
        let mut res = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
        res.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        return res;
    }
    next.run(req).await
}

pub fn new_rps_state(rps: u32) -> RateLimiter {
    RateLimiter::new(rps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_within_window() {
        let limiter = RateLimiter::new(2);
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0));
        assert!(limiter.allow_at(t0));
        assert!(!limiter.allow_at(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn window_resets_after_one_second() {
        let limiter = RateLimiter::new(1);
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0));
        assert!(!limiter.allow_at(t0));
        assert!(limiter.allow_at(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        let limiter = new_rps_state(0);
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0));
        assert!(!limiter.allow_at(t0));
    }

    #[test]
    fn clones_share_the_window() {
        let limiter = RateLimiter::new(1);
        let other = limiter.clone();
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0));
        assert!(!other.allow_at(t0));
    }
}
