use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PostType {
    /// Written by the host.
    Manual,
    /// Generated when the event's date or location changes.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub event_id: Uuid,
    pub message: String,
    pub post_type: PostType,
    pub created_at: DateTime<Utc>,
}
