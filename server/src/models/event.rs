use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::AttendanceResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location_address: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub image_url: Option<String>,
    pub date_from: DateTime<Utc>,
    pub date_to: Option<DateTime<Utc>>,
    pub host_id: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }
}

/// Validated field values for creating or updating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub location_address: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub image_url: Option<String>,
    pub date_from: DateTime<Utc>,
    pub date_to: Option<DateTime<Utc>>,
}

/// An event someone else hosts that the user has answered.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RespondedEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub response: AttendanceResponse,
}
