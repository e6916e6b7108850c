use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Attendance, AttendanceResponse, Attendee, Event, EventDraft, Post, PostType, RespondedEvent,
    Subscription, User, UserProfile,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// A uniqueness constraint rejected the write, usually a concurrent duplicate.
    #[error("unique constraint violated")]
    Conflict,

    #[error("referenced row does not exist")]
    MissingReference,

    #[error("not found")]
    NotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::MissingReference
            }
            sqlx::Error::RowNotFound => StoreError::NotFound,
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for everything the request handlers touch.
///
/// Every method is a single atomic operation. `create_event` also writes the
/// host's YES attendance inside the same transaction.
pub trait Store: Clone + Send + Sync + 'static {
    // Events
    fn create_event(
        &self,
        host_id: &str,
        draft: EventDraft,
    ) -> impl Future<Output = StoreResult<Event>> + Send;
    fn find_event(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<Event>>> + Send;
    fn update_event(
        &self,
        id: Uuid,
        draft: EventDraft,
    ) -> impl Future<Output = StoreResult<Event>> + Send;
    fn set_event_image(
        &self,
        id: Uuid,
        image_url: Option<String>,
    ) -> impl Future<Output = StoreResult<Event>> + Send;
    fn delete_event(&self, id: Uuid) -> impl Future<Output = StoreResult<()>> + Send;
    fn list_hosted_events(
        &self,
        host_id: &str,
    ) -> impl Future<Output = StoreResult<Vec<Event>>> + Send;
    fn list_responded_events(
        &self,
        user_id: &str,
    ) -> impl Future<Output = StoreResult<Vec<RespondedEvent>>> + Send;

    // Attendance
    fn find_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<Attendance>>> + Send;
    fn create_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
        response: AttendanceResponse,
    ) -> impl Future<Output = StoreResult<Attendance>> + Send;
    fn update_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
        response: AttendanceResponse,
    ) -> impl Future<Output = StoreResult<Attendance>> + Send;
    fn delete_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<()>> + Send;
    fn list_attendees(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<Attendee>>> + Send;

    // Posts
    fn create_post(
        &self,
        event_id: Uuid,
        message: &str,
        post_type: PostType,
    ) -> impl Future<Output = StoreResult<Post>> + Send;
    fn find_post(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<Post>>> + Send;
    fn update_post_message(
        &self,
        id: Uuid,
        message: &str,
    ) -> impl Future<Output = StoreResult<Post>> + Send;
    fn delete_post(&self, id: Uuid) -> impl Future<Output = StoreResult<()>> + Send;
    fn list_posts(&self, event_id: Uuid) -> impl Future<Output = StoreResult<Vec<Post>>> + Send;

    // Subscriptions
    fn find_subscription(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<Subscription>>> + Send;
    fn create_subscription(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Subscription>> + Send;
    fn delete_subscription(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<()>> + Send;
    fn subscriber_emails(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    // Users
    fn create_user(&self, profile: UserProfile) -> impl Future<Output = StoreResult<User>> + Send;
    fn update_user(&self, profile: UserProfile) -> impl Future<Output = StoreResult<User>> + Send;
    fn delete_user(&self, id: &str) -> impl Future<Output = StoreResult<()>> + Send;
    fn find_user(&self, id: &str) -> impl Future<Output = StoreResult<Option<User>>> + Send;
}
