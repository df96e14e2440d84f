use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::LocationPing;
use crate::models::order::{Order, OrderFilter, OrderGuard, OrderPatch};
use crate::store::{OrderRepository, PingStore};

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<Uuid, Order>,
    upstream_index: DashMap<String, Uuid>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order, AppError> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_or_insert_by_upstream_ref(
        &self,
        order: Order,
    ) -> Result<(Order, bool), AppError> {
        let upstream_ref = order.upstream_ref.clone().ok_or_else(|| {
            AppError::Internal("internal order stored without upstream ref".to_string())
        })?;

        // The index entry is the claim; the loser never stores its order,
        // so no reader ever sees two orders for one ref.
        match self.upstream_index.entry(upstream_ref) {
            Entry::Occupied(existing) => {
                let existing_id = *existing.get();
                drop(existing);
                let existing = self
                    .orders
                    .get(&existing_id)
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| {
                        AppError::Internal("upstream index points at a missing order".to_string())
                    })?;
                Ok((existing, false))
            }
            Entry::Vacant(slot) => {
                self.orders.insert(order.id, order.clone());
                slot.insert(order.id);
                Ok((order, true))
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Order, AppError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    async fn find_by_upstream_ref(
        &self,
        upstream_ref: &str,
    ) -> Result<Option<Order>, AppError> {
        let Some(id) = self.upstream_index.get(upstream_ref).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                filter
                    .customer_id
                    .is_none_or(|id| order.customer_id == Some(id))
                    && filter.driver_id.is_none_or(|id| order.driver_id == Some(id))
                    && filter.status.is_none_or(|status| order.status == status)
            })
            .map(|entry| entry.value().clone())
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_guarded(
        &self,
        id: Uuid,
        expected: OrderGuard,
        patch: &OrderPatch,
    ) -> Result<Order, AppError> {
        let mut order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        if order.guard() != expected {
            return Err(AppError::Conflict(format!(
                "order {id} was modified concurrently (status is now {})",
                order.status
            )));
        }

        patch.apply(&mut order, Utc::now());
        Ok(order.clone())
    }
}

#[derive(Default)]
pub struct MemoryPingStore {
    pings: DashMap<Uuid, Vec<LocationPing>>,
    seq: AtomicU64,
}

impl MemoryPingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PingStore for MemoryPingStore {
    async fn append(&self, mut ping: LocationPing) -> Result<LocationPing, AppError> {
        ping.seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.pings
            .entry(ping.order_id)
            .or_default()
            .push(ping.clone());
        Ok(ping)
    }

    async fn latest(&self, order_id: Uuid) -> Result<Option<LocationPing>, AppError> {
        Ok(self.pings.get(&order_id).and_then(|entry| {
            entry
                .value()
                .iter()
                .max_by_key(|ping| ping.sort_key())
                .cloned()
        }))
    }

    async fn trail(
        &self,
        order_id: Uuid,
        limit: usize,
    ) -> Result<Vec<LocationPing>, AppError> {
        let Some(entry) = self.pings.get(&order_id) else {
            return Ok(Vec::new());
        };

        let mut trail = entry.value().clone();
        drop(entry);
        trail.sort_by_key(|ping| ping.sort_key());

        if trail.len() > limit {
            trail.drain(..trail.len() - limit);
        }
        Ok(trail)
    }
}
