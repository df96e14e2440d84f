use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::events::TrackingEvent;
use crate::models::location::{GeoPoint, LocationPing};
use crate::observability::metrics::Metrics;
use crate::store::{OrderRepository, PingStore};

#[derive(Debug, Clone, Deserialize)]
pub struct PingDraft {
    pub order_id: Uuid,
    pub position: GeoPoint,
    #[serde(default)]
    pub heading_deg: Option<f32>,
    #[serde(default)]
    pub speed_mps: Option<f32>,
    #[serde(default)]
    pub accuracy_m: Option<f32>,
    #[serde(default)]
    pub battery_pct: Option<f32>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

pub struct LocationTracker {
    orders: Arc<dyn OrderRepository>,
    pings: Arc<dyn PingStore>,
    metrics: Metrics,
    events: broadcast::Sender<TrackingEvent>,
}

impl LocationTracker {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        pings: Arc<dyn PingStore>,
        metrics: Metrics,
        events: broadcast::Sender<TrackingEvent>,
    ) -> Self {
        Self {
            orders,
            pings,
            metrics,
            events,
        }
    }

    pub async fn record_ping(
        &self,
        driver_id: Uuid,
        draft: PingDraft,
    ) -> Result<LocationPing, AppError> {
        validate_draft(&draft)?;

        let order = self.orders.get(draft.order_id).await?;
        if !order.status.accepts_tracking() {
            self.count("rejected");
            return Err(AppError::InvalidState(format!(
                "order {} does not accept tracking while {}",
                order.id, order.status
            )));
        }
        if order.driver_id != Some(driver_id) {
            // logged with the mismatch, answered without it
            warn!(
                order_id = %order.id,
                driver_id = %driver_id,
                assigned = ?order.driver_id,
                "ping from driver not assigned to order"
            );
            self.count("forbidden");
            return Err(AppError::Forbidden);
        }

        let now = Utc::now();
        let ping = LocationPing {
            id: Uuid::new_v4(),
            order_id: order.id,
            driver_id,
            position: draft.position,
            heading_deg: draft.heading_deg,
            speed_mps: draft.speed_mps,
            accuracy_m: draft.accuracy_m,
            battery_pct: draft.battery_pct,
            captured_at: draft.captured_at.unwrap_or(now),
            received_at: now,
            seq: 0,
        };
        let stored = self.pings.append(ping).await?;

        self.count("recorded");
        let _ = self.events.send(TrackingEvent::PingRecorded {
            order_id: stored.order_id,
            driver_id: stored.driver_id,
            position: stored.position,
            captured_at: stored.captured_at,
        });
        debug!(
            order_id = %stored.order_id,
            driver_id = %stored.driver_id,
            lat = stored.position.latitude,
            lng = stored.position.longitude,
            "ping recorded"
        );

        Ok(stored)
    }

    pub async fn latest(&self, order_id: Uuid) -> Result<Option<LocationPing>, AppError> {
        self.pings.latest(order_id).await
    }

    pub async fn trail(
        &self,
        order_id: Uuid,
        limit: usize,
    ) -> Result<Vec<LocationPing>, AppError> {
        self.pings.trail(order_id, limit).await
    }

    fn count(&self, outcome: &str) {
        self.metrics
            .location_pings_total
            .with_label_values(&[outcome])
            .inc();
    }
}

fn validate_draft(draft: &PingDraft) -> Result<(), AppError> {
    let GeoPoint {
        latitude,
        longitude,
    } = draft.position;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::Validation(format!(
            "latitude {latitude} out of range [-90, 90]"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation(format!(
            "longitude {longitude} out of range [-180, 180]"
        )));
    }
    if let Some(heading) = draft.heading_deg {
        if !(0.0..360.0).contains(&heading) {
            return Err(AppError::Validation(format!(
                "heading {heading} out of range [0, 360)"
            )));
        }
    }
    if let Some(speed) = draft.speed_mps {
        if !(speed >= 0.0) {
            return Err(AppError::Validation(format!(
                "speed {speed} must be non-negative"
            )));
        }
    }
    if let Some(accuracy) = draft.accuracy_m {
        if !(accuracy > 0.0) {
            return Err(AppError::Validation(format!(
                "accuracy {accuracy} must be positive"
            )));
        }
    }
    if let Some(battery) = draft.battery_pct {
        if !(0.0..=100.0).contains(&battery) {
            return Err(AppError::Validation(format!(
                "battery {battery} out of range [0, 100]"
            )));
        }
    }
    Ok(())
}
