use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_response", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceResponse {
    Yes,
    Maybe,
    No,
}

/// One row per (user, event); a missing row means the user has not answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub user_id: String,
    pub event_id: Uuid,
    pub response: AttendanceResponse,
    pub created_at: DateTime<Utc>,
}

/// Attendance row joined with the attendee's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Attendee {
    pub user_id: String,
    pub event_id: Uuid,
    pub response: AttendanceResponse,
    pub full_name: String,
    pub profile_image_url: Option<String>,
}
