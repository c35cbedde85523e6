//! Configuration management for Gatehouse
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::ratelimit::{LimiterGroup, RateLimitPolicy};

/// Which rate limiter backs the middleware.
///
/// Exactly one backend is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Fixed-window counters in Redis (shared across instances)
    Redis,
    /// Fixed-window counters in process memory (single instance only)
    Memory,
    /// Governor token buckets in process memory (single instance only)
    TokenBucket,
}

impl FromStr for RateLimitBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "token-bucket" | "token_bucket" => Ok(Self::TokenBucket),
            other => bail!("Unknown rate limit backend: {}", other),
        }
    }
}

impl std::fmt::Display for RateLimitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
            Self::TokenBucket => "token-bucket",
        })
    }
}

/// SMTP settings for the email queue
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender used when a queued message leaves `from` empty
    pub default_from: String,
}

/// Twilio settings for the SMS queue
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub api_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Redis connection URL
    pub redis_url: String,

    /// Shared secret for signing and verifying bearer tokens
    pub jwt_key: String,
    /// Upper bound on cached token validations (0 = unbounded)
    pub claims_cache_max_entries: usize,

    /// Active rate limiter backend
    pub rate_limit_backend: RateLimitBackend,
    /// Policy applied to the public route group
    pub public_rate_limit: RateLimitPolicy,
    /// Policy applied to the private route group
    pub private_rate_limit: RateLimitPolicy,
    /// Timeout for each counter store round trip
    pub rate_limit_store_timeout: Duration,
    /// Let requests through when the counter store is unreachable
    pub rate_limit_fail_open: bool,
    /// Read the client address from X-Forwarded-For / X-Real-IP
    pub trust_proxy_headers: bool,

    /// Capacity of the access log queue
    pub log_queue_capacity: usize,
    /// Capacity of the outbound email queue
    pub email_queue_capacity: usize,
    /// Capacity of the outbound SMS queue
    pub sms_queue_capacity: usize,
    /// How long queues may take to drain on shutdown
    pub shutdown_drain_timeout: Duration,

    /// SMTP transport, if configured
    pub smtp: Option<SmtpConfig>,
    /// Twilio transport, if configured
    pub twilio: Option<TwilioConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let max_requests: u32 = parse_var("RATE_LIMIT_MAX_REQUESTS", "5")?;
        let window_seconds: u64 = parse_var("RATE_LIMIT_WINDOW_SECONDS", "60")?;
        if max_requests == 0 || window_seconds == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS and RATE_LIMIT_WINDOW_SECONDS must be positive");
        }
        let window = Duration::from_secs(window_seconds);

        let public_max: u32 =
            parse_var("PUBLIC_RATE_LIMIT_MAX_REQUESTS", &max_requests.to_string())?;
        let private_max: u32 =
            parse_var("PRIVATE_RATE_LIMIT_MAX_REQUESTS", &max_requests.to_string())?;

        Ok(Self {
            host: env::var("GATEHOUSE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("GATEHOUSE_PORT", "8080")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            jwt_key: env::var("JWT_KEY").context("JWT_KEY must be set")?,
            claims_cache_max_entries: parse_var("CLAIMS_CACHE_MAX_ENTRIES", "10000")?,

            rate_limit_backend: env::var("RATE_LIMIT_BACKEND")
                .unwrap_or_else(|_| "redis".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_BACKEND")?,
            public_rate_limit: RateLimitPolicy::new(public_max, window),
            private_rate_limit: RateLimitPolicy::new(private_max, window),
            rate_limit_store_timeout: Duration::from_millis(parse_var(
                "RATE_LIMIT_STORE_TIMEOUT_MS",
                "250",
            )?),
            rate_limit_fail_open: flag("RATE_LIMIT_FAIL_OPEN"),
            trust_proxy_headers: flag("TRUST_PROXY_HEADERS"),

            log_queue_capacity: parse_var("LOG_QUEUE_CAPACITY", "100")?,
            email_queue_capacity: parse_var("EMAIL_QUEUE_CAPACITY", "100")?,
            sms_queue_capacity: parse_var("SMS_QUEUE_CAPACITY", "100")?,
            shutdown_drain_timeout: Duration::from_secs(parse_var(
                "SHUTDOWN_DRAIN_SECONDS",
                "10",
            )?),

            smtp: smtp_from_env()?,
            twilio: twilio_from_env(),
        })
    }

    /// Policy for a limiter group
    pub fn rate_limit_policy(&self, group: LimiterGroup) -> RateLimitPolicy {
        match group {
            LimiterGroup::Public => self.public_rate_limit,
            LimiterGroup::Private => self.private_rate_limit,
        }
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn smtp_from_env() -> Result<Option<SmtpConfig>> {
    let (Ok(username), Ok(password)) = (env::var("SMTP_USERNAME"), env::var("SMTP_PASSWORD"))
    else {
        return Ok(None);
    };

    Ok(Some(SmtpConfig {
        host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
        port: parse_var("SMTP_PORT", "465")?,
        default_from: env::var("EMAIL_FROM").unwrap_or_else(|_| username.clone()),
        username,
        password,
    }))
}

fn twilio_from_env() -> Option<TwilioConfig> {
    Some(TwilioConfig {
        api_url: env::var("TWILIO_API_URL")
            .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
        account_sid: env::var("TWILIO_ACCOUNT_SID").ok()?,
        auth_token: env::var("TWILIO_AUTH_TOKEN").ok()?,
        from_number: env::var("TWILIO_FROM_NUMBER").ok()?,
    })
}
