//! Gatehouse - request middleware for authenticated, rate-limited APIs
//!
//! This library provides the shared request pipeline: bearer token
//! authentication with a claims cache, per-client rate limiting, and bounded
//! queues that move access logging, email and SMS off the request path.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod ratelimit;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

pub use crate::auth::{ClaimsCache, IdentityClaim, JwtCodec, TokenValidator, TokenVerifier};
pub use crate::config::{Config, RateLimitBackend};
pub use crate::dispatch::{Dispatcher, EmailSender, SmsSender};
pub use crate::middleware::AuthenticatedUser;
pub use crate::ratelimit::{LimiterGroup, RateLimiter, RateLimiters};
pub use crate::routes::create_router;

use crate::dispatch::{SmtpEmailSender, TwilioSmsSender, Unconfigured};
use crate::ratelimit::{
    FixedWindowLimiter, InMemoryCounterStore, RedisCounterStore, TokenBucketLimiter,
};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Present only when the Redis rate limit backend is active
    pub redis: Option<redis::aio::ConnectionManager>,
    /// Signs tokens for handlers that log users in
    pub jwt: Arc<JwtCodec>,
    pub token_validator: Arc<TokenValidator>,
    pub rate_limiters: RateLimiters,
    pub dispatch: Arc<Dispatcher>,
}

impl AppState {
    /// Create a new application state and start the dispatch workers
    pub async fn new(config: Config) -> Result<Self> {
        let (redis, rate_limiters) = match config.rate_limit_backend {
            RateLimitBackend::Redis => {
                let redis_client = redis::Client::open(config.redis_url.as_str())?;
                let redis = redis::aio::ConnectionManager::new(redis_client).await?;
                let store = Arc::new(RedisCounterStore::new(redis.clone()));
                let limiters = fixed_window_limiters(&config, store);
                (Some(redis), limiters)
            }
            RateLimitBackend::Memory => {
                let store = Arc::new(InMemoryCounterStore::new());
                spawn_counter_purge(store.clone(), &config);
                (None, fixed_window_limiters(&config, store))
            }
            RateLimitBackend::TokenBucket => {
                let limiters = RateLimiters::new(
                    Arc::new(TokenBucketLimiter::new(config.public_rate_limit)),
                    Arc::new(TokenBucketLimiter::new(config.private_rate_limit)),
                );
                (None, limiters)
            }
        };
        info!(backend = %config.rate_limit_backend, "Rate limiter initialized");

        let email_sender: Arc<dyn EmailSender> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpEmailSender::new(smtp)?),
            None => {
                warn!("SMTP is not configured, outbound email will fail");
                Arc::new(Unconfigured)
            }
        };

        let sms_sender: Arc<dyn SmsSender> = match &config.twilio {
            Some(twilio) => Arc::new(TwilioSmsSender::new(twilio)?),
            None => {
                warn!("Twilio is not configured, outbound SMS will fail");
                Arc::new(Unconfigured)
            }
        };

        Ok(Self::with_services(
            config,
            redis,
            rate_limiters,
            email_sender,
            sms_sender,
        ))
    }

    /// Assemble state from already-built services and start the dispatch
    /// workers. Must be called inside a tokio runtime.
    pub fn with_services(
        config: Config,
        redis: Option<redis::aio::ConnectionManager>,
        rate_limiters: RateLimiters,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
    ) -> Self {
        let jwt = Arc::new(JwtCodec::new(config.jwt_key.as_bytes()));
        let token_validator = Arc::new(TokenValidator::new(
            jwt.clone(),
            ClaimsCache::with_capacity(config.claims_cache_max_entries),
        ));

        let dispatch = Arc::new(Dispatcher::new(&config, email_sender, sms_sender));
        dispatch.start();

        Self {
            config,
            start_time: Instant::now(),
            redis,
            jwt,
            token_validator,
            rate_limiters,
            dispatch,
        }
    }
}

fn fixed_window_limiters(
    config: &Config,
    store: Arc<dyn ratelimit::CounterStore>,
) -> RateLimiters {
    let limiter = |group| -> Arc<dyn RateLimiter> {
        Arc::new(FixedWindowLimiter::new(
            store.clone(),
            config.rate_limit_policy(group),
            config.rate_limit_store_timeout,
        ))
    };
    RateLimiters::new(limiter(LimiterGroup::Public), limiter(LimiterGroup::Private))
}

/// Periodically drop elapsed windows from the in-memory store
fn spawn_counter_purge(store: Arc<InMemoryCounterStore>, config: &Config) {
    let period = config
        .public_rate_limit
        .window
        .min(config.private_rate_limit.window);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            store.purge_expired();
        }
    });
}
