use std::sync::Arc;

use tokio::sync::broadcast;

use crate::admission::{CounterStore, RateGate};
use crate::config::Config;
use crate::fleet::{FleetRegistry, MemoryFleet};
use crate::lifecycle::assignment::AssignmentService;
use crate::lifecycle::intake::OrderIntake;
use crate::lifecycle::service::OrderLifecycle;
use crate::models::events::TrackingEvent;
use crate::observability::metrics::Metrics;
use crate::store::memory::{MemoryOrderStore, MemoryPingStore};
use crate::store::OrderRepository;
use crate::tracking::LocationTracker;

pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub fleet: Arc<dyn FleetRegistry>,
    pub intake: OrderIntake,
    pub lifecycle: OrderLifecycle,
    pub assignment: AssignmentService,
    pub tracker: LocationTracker,
    pub rate_gate: RateGate,
    pub events_tx: broadcast::Sender<TrackingEvent>,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_counter_store(config, None)
    }

    pub fn with_counter_store(
        config: Config,
        shared_counters: Option<Arc<dyn CounterStore>>,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let metrics = Metrics::new();
        let orders: Arc<dyn OrderRepository> = Arc::new(MemoryOrderStore::new());
        let pings = Arc::new(MemoryPingStore::new());
        let fleet: Arc<dyn FleetRegistry> = Arc::new(MemoryFleet::new());
        let rate_gate = RateGate::new(
            shared_counters,
            config.redis_timeout,
            config.rate_fallback_enabled,
            metrics.clone(),
        );

        Self {
            intake: OrderIntake::new(orders.clone(), metrics.clone(), events_tx.clone()),
            lifecycle: OrderLifecycle::new(
                orders.clone(),
                fleet.clone(),
                metrics.clone(),
                events_tx.clone(),
            ),
            assignment: AssignmentService::new(
                orders.clone(),
                fleet.clone(),
                metrics.clone(),
                events_tx.clone(),
            ),
            tracker: LocationTracker::new(
                orders.clone(),
                pings,
                metrics.clone(),
                events_tx.clone(),
            ),
            orders,
            fleet,
            rate_gate,
            events_tx,
            metrics,
            config,
        }
    }
}
