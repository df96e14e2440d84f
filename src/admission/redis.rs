use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::admission::policy::RatePolicy;
use crate::admission::CounterStore;
use crate::error::AppError;

pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url)
            .map_err(|err| AppError::Unavailable(format!("redis url rejected: {err}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| AppError::Unavailable(format!("redis unreachable: {err}")))?;
        info!(url = url, "connected to shared rate counter store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn bump(
        &self,
        key: &str,
        policy: &RatePolicy,
    ) -> Result<(u64, DateTime<Utc>), AppError> {
        let mut conn = self.conn.clone();
        let window_secs = policy.window_secs as i64;
        let now = Utc::now();

        let count: u64 = conn
            .incr(key, 1u64)
            .await
            .map_err(|err| AppError::Unavailable(format!("redis incr: {err}")))?;

        if count == 1 {
            let _: bool = conn
                .expire(key, window_secs)
                .await
                .map_err(|err| AppError::Unavailable(format!("redis expire: {err}")))?;
            return Ok((count, now + Duration::seconds(window_secs)));
        }

        let ttl: i64 = conn
            .ttl(key)
            .await
            .map_err(|err| AppError::Unavailable(format!("redis ttl: {err}")))?;
        if ttl < 0 {
            // the expiry was lost (flush, restore); re-arm it so the key
            // cannot count forever
            let _: bool = conn
                .expire(key, window_secs)
                .await
                .map_err(|err| AppError::Unavailable(format!("redis expire: {err}")))?;
            return Ok((count, now + Duration::seconds(window_secs)));
        }

        Ok((count, now + Duration::seconds(ttl)))
    }
}
