use std::env;
use std::time::Duration;

use crate::admission::policy::RatePolicy;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    /// Shared rate counter store; None runs the gate on local counters only.
    pub redis_url: Option<String>,
    pub redis_timeout: Duration,
    pub rate_fallback_enabled: bool,
    pub rate_orders: RatePolicy,
    pub rate_tracking: RatePolicy,
    pub rate_general: RatePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            redis_timeout: Duration::from_millis(parse_or_default("REDIS_TIMEOUT_MS", 150)?),
            rate_fallback_enabled: parse_or_default("RATE_FALLBACK_ENABLED", true)?,
            rate_orders: RatePolicy {
                name: "orders",
                max_requests: parse_or_default("RATE_ORDERS_MAX", 30)?,
                window_secs: parse_or_default("RATE_ORDERS_WINDOW_SECS", 60)?,
            },
            rate_tracking: RatePolicy {
                name: "tracking",
                max_requests: parse_or_default("RATE_TRACKING_MAX", 120)?,
                window_secs: parse_or_default("RATE_TRACKING_WINDOW_SECS", 60)?,
            },
            rate_general: RatePolicy {
                name: "general",
                max_requests: parse_or_default("RATE_GENERAL_MAX", 300)?,
                window_secs: parse_or_default("RATE_GENERAL_WINDOW_SECS", 60)?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
