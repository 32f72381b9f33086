use std::{env, sync::Arc};

use sqlx::SqlitePool;

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt: JwtConfig,
    pub limiter: Arc<RateLimiter>,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_hours: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        let secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me".to_string());
        if secret == "change-me" {
            log::warn!("JWT_SECRET not set. Using an insecure default. Set JWT_SECRET in production.");
        }
        let access_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(24 * 7);
        let refresh_ttl_hours = env::var("JWT_REFRESH_TTL_HOURS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(24 * 30);
        Self {
            secret,
            access_ttl_hours,
            refresh_ttl_hours,
        }
    }
}
