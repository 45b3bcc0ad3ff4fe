/// Rate Limiting System
use crate::{
    config::RateLimitConfig,
    error::{AdminError, AdminResult},
    metrics,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{keyed::DefaultKeyedStateStore, InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;
type KeyedLimiter = GovernorLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiter manager
///
/// Login attempts are limited per email so one account under attack does
/// not lock out the others; the admin API shares one direct quota.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    login: Arc<KeyedLimiter>,
    api: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let login_quota = Quota::per_minute(non_zero(config.login_attempts_per_minute, 10));
        let api_quota = Quota::per_second(non_zero(config.requests_per_second, 50));

        Self {
            enabled: config.enabled,
            login: Arc::new(GovernorLimiter::keyed(login_quota)),
            api: Arc::new(GovernorLimiter::direct(api_quota)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check the login quota for `email`
    pub fn check_login(&self, email: &str) -> AdminResult<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.login.check_key(&email.trim().to_lowercase()) {
            Ok(_) => Ok(()),
            Err(_) => {
                tracing::warn!("Login rate limit exceeded for {}", email);
                metrics::record_auth_attempt("throttled");
                Err(AdminError::RateLimitExceeded {
                    retry_after: Duration::from_secs(60),
                })
            }
        }
    }

    /// Check the admin API quota
    pub fn check_api(&self) -> AdminResult<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.api.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(AdminError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            }),
        }
    }
}

fn non_zero(value: u32, fallback: u32) -> NonZeroU32 {
    NonZeroU32::new(value)
        .or_else(|| NonZeroU32::new(fallback))
        .unwrap_or(NonZeroU32::MIN)
}

/// Rate limiting middleware for `/admin` routes
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AdminContext>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path().starts_with("/admin") {
        if let Err(e) = ctx.rate_limiter.check_api() {
            return e.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(login_attempts_per_minute: u32, requests_per_second: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            login_attempts_per_minute,
            requests_per_second,
        }
    }

    #[test]
    fn test_login_limit_is_per_email() {
        let limiter = RateLimiter::new(&config(2, 50));

        assert!(limiter.check_login("admin@example.com").is_ok());
        assert!(limiter.check_login("ADMIN@example.com").is_ok());
        assert!(matches!(
            limiter.check_login("admin@example.com"),
            Err(AdminError::RateLimitExceeded { .. })
        ));

        assert!(limiter.check_login("moderator@example.com").is_ok());
    }

    #[test]
    fn test_api_limit() {
        let limiter = RateLimiter::new(&config(10, 1));

        assert!(limiter.check_api().is_ok());
        assert!(limiter.check_api().is_err());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let mut cfg = config(1, 1);
        cfg.enabled = false;
        let limiter = RateLimiter::new(&cfg);

        for _ in 0..5 {
            assert!(limiter.check_login("admin@example.com").is_ok());
            assert!(limiter.check_api().is_ok());
        }
    }

    #[test]
    fn test_zero_quota_falls_back() {
        assert_eq!(non_zero(0, 10).get(), 10);
        assert_eq!(non_zero(0, 0).get(), 1);
        assert_eq!(non_zero(3, 10).get(), 3);
    }
}
