use std::{collections::HashMap, env, sync::Mutex};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, HttpResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Fixed-window request counter keyed by client IP. One window per key;
/// the count resets when the window has elapsed.
pub struct RateLimiter {
    window_secs: i64,
    max_requests: u32,
    buckets: Mutex<HashMap<String, Bucket>>,
}

struct Bucket {
    window_start: i64,
    count: u32,
}

impl RateLimiter {
    pub fn new(window_secs: i64, max_requests: u32) -> Self {
        Self {
            window_secs,
            max_requests,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        let window_secs = env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(900);
        let max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(100);
        Self::new(window_secs, max_requests)
    }

    pub fn check(&self, key: &str) -> bool {
        let now = Utc::now().timestamp();
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buckets.len() > 4096 {
            let window = self.window_secs;
            buckets.retain(|_, bucket| now - bucket.window_start < window);
        }
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            window_start: now,
            count: 0,
        });
        if now - bucket.window_start >= self.window_secs {
            bucket.window_start = now;
            bucket.count = 0;
        }
        bucket.count += 1;
        bucket.count <= self.max_requests
    }
}

pub async fn enforce<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    let key = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    let allowed = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.limiter.check(&key))
        .unwrap_or(true);

    if !allowed {
        let response = HttpResponse::TooManyRequests()
            .json(json!({ "message": "too many requests, try again later" }));
        return Ok(req.into_response(response));
    }

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_window_maximum() {
        let limiter = RateLimiter::new(60, 3);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(60, 1);
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"));
    }

    #[test]
    fn window_rollover_resets_the_count() {
        let limiter = RateLimiter::new(0, 1);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
    }
}
