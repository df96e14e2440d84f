use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// `seq` is the store-assigned arrival ordinal; it breaks ties between
/// pings whose device clocks produced the same `captured_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPing {
    pub id: Uuid,
    pub order_id: Uuid,
    pub driver_id: Uuid,
    pub position: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_pct: Option<f32>,
    pub captured_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    #[serde(skip)]
    pub seq: u64,
}

impl LocationPing {
    pub fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.captured_at, self.seq)
    }
}
