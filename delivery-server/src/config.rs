//! Server configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Delivery server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub http_port: u16,
    /// redb database file
    pub database_path: String,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
    /// SMS gateway endpoint; unset means SMS is logged only
    pub sms_api_url: Option<String>,
    pub sms_api_key: String,
    pub sms_from_number: String,
    /// PLACED orders older than this are cancelled and refunded
    pub auto_cancel_grace: Duration,
    pub auto_cancel_interval: Duration,
    /// How long after completion a buyer is asked for a review
    pub review_prompt_delay: Duration,
    /// Width of the completion-time window scanned by the review scheduler
    pub review_prompt_window: Duration,
    pub review_prompt_interval: Duration,
    pub scheduler_initial_delay: Duration,
    /// Ceiling lifetime of one SSE subscription
    pub sse_max_lifetime: Duration,
    pub sse_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            http_port: 8080,
            database_path: "data/delivery.redb".into(),
            jwt_secret: "dev-JWT_SECRET-not-for-production".into(),
            sms_api_url: None,
            sms_api_key: String::new(),
            sms_from_number: String::new(),
            auto_cancel_grace: Duration::from_secs(300),
            auto_cancel_interval: Duration::from_secs(60),
            review_prompt_delay: Duration::from_secs(3600),
            review_prompt_window: Duration::from_secs(3600),
            review_prompt_interval: Duration::from_secs(600),
            scheduler_initial_delay: Duration::from_secs(60),
            sse_max_lifetime: Duration::from_secs(1800),
            sse_channel_capacity: 16,
        }
    }
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Parse an optional raw value, rejecting anything that does not parse
    fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> Result<T, BoxError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match raw {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| format!("{name} has invalid value '{v}': {e}").into()),
            None => Ok(default),
        }
    }

    fn env_parse<T>(name: &str, default: T) -> Result<T, BoxError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Self::parse_value(name, std::env::var(name).ok(), default)
    }

    fn secs(name: &str, default: Duration) -> Result<Duration, BoxError> {
        let secs = Self::env_parse(name, default.as_secs())?;
        Ok(Duration::from_secs(secs))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let defaults = Self::default();
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let sse_channel_capacity =
            Self::env_parse("SSE_CHANNEL_CAPACITY", defaults.sse_channel_capacity)?;
        if sse_channel_capacity == 0 {
            return Err("SSE_CHANNEL_CAPACITY must be at least 1".into());
        }

        Ok(Self {
            http_port: Self::env_parse("HTTP_PORT", defaults.http_port)?,
            database_path: std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            sms_api_url: std::env::var("SMS_API_URL").ok().filter(|s| !s.is_empty()),
            sms_api_key: std::env::var("SMS_API_KEY").unwrap_or_default(),
            sms_from_number: std::env::var("SMS_FROM_NUMBER").unwrap_or_default(),
            auto_cancel_grace: Self::secs("AUTO_CANCEL_GRACE_SECS", defaults.auto_cancel_grace)?,
            auto_cancel_interval: Self::secs(
                "AUTO_CANCEL_INTERVAL_SECS",
                defaults.auto_cancel_interval,
            )?,
            review_prompt_delay: Self::secs(
                "REVIEW_PROMPT_DELAY_SECS",
                defaults.review_prompt_delay,
            )?,
            review_prompt_window: Self::secs(
                "REVIEW_PROMPT_WINDOW_SECS",
                defaults.review_prompt_window,
            )?,
            review_prompt_interval: Self::secs(
                "REVIEW_PROMPT_INTERVAL_SECS",
                defaults.review_prompt_interval,
            )?,
            scheduler_initial_delay: Self::secs(
                "SCHEDULER_INITIAL_DELAY_SECS",
                defaults.scheduler_initial_delay,
            )?,
            sse_max_lifetime: Self::secs("SSE_MAX_LIFETIME_SECS", defaults.sse_max_lifetime)?,
            sse_channel_capacity,
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
