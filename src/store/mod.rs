pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::LocationPing;
use crate::models::order::{Order, OrderFilter, OrderGuard, OrderPatch};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: Order) -> Result<Order, AppError>;

    /// Atomic claim on the upstream reference; the flag is false when an
    /// order already carried it.
    async fn find_or_insert_by_upstream_ref(
        &self,
        order: Order,
    ) -> Result<(Order, bool), AppError>;

    async fn get(&self, id: Uuid) -> Result<Order, AppError>;

    async fn find_by_upstream_ref(&self, upstream_ref: &str)
        -> Result<Option<Order>, AppError>;

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError>;

    /// Applies `patch` only while status and crew refs still match
    /// `expected`; a rival write in between turns this into a conflict.
    async fn update_guarded(
        &self,
        id: Uuid,
        expected: OrderGuard,
        patch: &OrderPatch,
    ) -> Result<Order, AppError>;
}

#[async_trait]
pub trait PingStore: Send + Sync {
    async fn append(&self, ping: LocationPing) -> Result<LocationPing, AppError>;

    /// Most recent ping by (captured_at, seq).
    async fn latest(&self, order_id: Uuid) -> Result<Option<LocationPing>, AppError>;

    async fn trail(&self, order_id: Uuid, limit: usize)
        -> Result<Vec<LocationPing>, AppError>;
}
