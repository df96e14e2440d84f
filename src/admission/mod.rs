pub mod layer;
pub mod local;
pub mod policy;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::admission::local::LocalCounterStore;
use crate::admission::policy::{RateDecision, RatePolicy};
use crate::error::AppError;
use crate::observability::metrics::Metrics;

/// `bump` consumes one slot and reports the post-bump count plus the
/// window's reset time.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn bump(&self, key: &str, policy: &RatePolicy)
        -> Result<(u64, DateTime<Utc>), AppError>;
}

/// An unreachable primary degrades to per-process limiting when fallback
/// is enabled and to 503 when it is not.
pub struct RateGate {
    primary: Option<Arc<dyn CounterStore>>,
    local: LocalCounterStore,
    timeout: Duration,
    fallback_enabled: bool,
    metrics: Metrics,
}

impl RateGate {
    pub fn new(
        primary: Option<Arc<dyn CounterStore>>,
        timeout: Duration,
        fallback_enabled: bool,
        metrics: Metrics,
    ) -> Self {
        Self {
            primary,
            local: LocalCounterStore::new(),
            timeout,
            fallback_enabled,
            metrics,
        }
    }

    pub async fn check(&self, key: &str, policy: &RatePolicy) -> Result<RateDecision, AppError> {
        let shared = match &self.primary {
            Some(primary) => match tokio::time::timeout(self.timeout, primary.bump(key, policy))
                .await
            {
                Ok(Ok(counted)) => Some(counted),
                Ok(Err(err)) => {
                    warn!(policy = policy.name, error = %err, "shared rate store error");
                    None
                }
                Err(_) => {
                    warn!(
                        policy = policy.name,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "shared rate store timed out"
                    );
                    None
                }
            },
            None => None,
        };

        let (count, reset_at) = match shared {
            Some(counted) => counted,
            None if self.primary.is_none() || self.fallback_enabled => {
                self.local.bump(key, policy).await?
            }
            None => {
                self.count(policy.name, "unavailable");
                return Err(AppError::Unavailable(
                    "rate limit store unreachable".to_string(),
                ));
            }
        };

        let allowed = count <= policy.max_requests;
        self.count(policy.name, if allowed { "allowed" } else { "denied" });
        Ok(RateDecision {
            allowed,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(count),
            reset_at,
        })
    }

    fn count(&self, policy: &str, outcome: &str) {
        self.metrics
            .admission_decisions_total
            .with_label_values(&[policy, outcome])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RatePolicy = RatePolicy {
        name: "test",
        max_requests: 2,
        window_secs: 60,
    };

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn bump(
            &self,
            _key: &str,
            _policy: &RatePolicy,
        ) -> Result<(u64, DateTime<Utc>), AppError> {
            Err(AppError::Unavailable("connection refused".to_string()))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CounterStore for StalledStore {
        async fn bump(
            &self,
            _key: &str,
            _policy: &RatePolicy,
        ) -> Result<(u64, DateTime<Utc>), AppError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok((1, Utc::now()))
        }
    }

    #[tokio::test]
    async fn local_only_gate_denies_over_budget() {
        let gate = RateGate::new(None, Duration::from_millis(50), true, Metrics::new());

        let first = gate.check("k", &POLICY).await.unwrap();
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        let second = gate.check("k", &POLICY).await.unwrap();
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        let third = gate.check("k", &POLICY).await.unwrap();
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
    }

    #[tokio::test]
    async fn broken_primary_falls_back_to_local_counting() {
        let gate = RateGate::new(
            Some(Arc::new(BrokenStore)),
            Duration::from_millis(50),
            true,
            Metrics::new(),
        );

        let first = gate.check("k", &POLICY).await.unwrap();
        assert!(first.allowed);
        let _ = gate.check("k", &POLICY).await.unwrap();
        let third = gate.check("k", &POLICY).await.unwrap();
        assert!(!third.allowed);
    }

    #[tokio::test]
    async fn broken_primary_without_fallback_is_unavailable() {
        let gate = RateGate::new(
            Some(Arc::new(BrokenStore)),
            Duration::from_millis(50),
            false,
            Metrics::new(),
        );

        let err = gate.check("k", &POLICY).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_primary_times_out_into_fallback() {
        let gate = RateGate::new(
            Some(Arc::new(StalledStore)),
            Duration::from_millis(100),
            true,
            Metrics::new(),
        );

        let decision = gate.check("k", &POLICY).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }
}
