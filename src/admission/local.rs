use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::admission::policy::RatePolicy;
use crate::admission::CounterStore;
use crate::error::AppError;

struct Window {
    count: u64,
    expires_at: DateTime<Utc>,
}

/// Counts are per process; under fallback, N instances admit up to N times
/// the shared budget.
pub struct LocalCounterStore {
    windows: DashMap<String, Window>,
}

impl LocalCounterStore {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    async fn bump(
        &self,
        key: &str,
        policy: &RatePolicy,
    ) -> Result<(u64, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let mut window = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            expires_at: now + Duration::seconds(policy.window_secs as i64),
        });
        if window.expires_at <= now {
            window.count = 0;
            window.expires_at = now + Duration::seconds(policy.window_secs as i64);
        }
        window.count += 1;
        Ok((window.count, window.expires_at))
    }
}
