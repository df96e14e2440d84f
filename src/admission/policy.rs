use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RatePolicy {
    pub name: &'static str,
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateDecision {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from(self.reset_at.timestamp().max(0)),
        );
        if !self.allowed {
            let retry_secs = (self.reset_at - Utc::now()).num_seconds().max(1);
            headers.insert("retry-after", HeaderValue::from(retry_secs));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn allowed_decisions_skip_retry_after() {
        let decision = RateDecision {
            allowed: true,
            limit: 30,
            remaining: 12,
            reset_at: Utc::now() + Duration::seconds(42),
        };
        let headers = decision.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "30");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "12");
        assert!(headers.get("x-ratelimit-reset").is_some());
        assert!(headers.get("retry-after").is_none());
    }

    #[test]
    fn denials_carry_retry_after() {
        let decision = RateDecision {
            allowed: false,
            limit: 30,
            remaining: 0,
            reset_at: Utc::now() + Duration::seconds(42),
        };
        let headers = decision.headers();
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
        let retry: i64 = headers
            .get("retry-after")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=42).contains(&retry));
    }
}
