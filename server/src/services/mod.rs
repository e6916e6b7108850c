//! Request-scoped actions. Each function performs its own validation,
//! persistence and revalidation, and returns a typed result or an
//! [`AppError`].

use uuid::Uuid;

use crate::models::Event;
use crate::store::Store;
use crate::utils::error::AppError;

pub mod attendance;
pub mod changes;
pub mod events;
pub mod notifications;
pub mod posts;
pub mod subscriptions;
pub mod users;

pub(crate) async fn load_event<S: Store>(store: &S, event_id: Uuid) -> Result<Event, AppError> {
    store
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with id '{event_id}' was not found")))
}

pub(crate) fn ensure_host(event: &Event, user_id: &str) -> Result<(), AppError> {
    if event.is_hosted_by(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the host can manage this event".to_string(),
        ))
    }
}
