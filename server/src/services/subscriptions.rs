use serde::Serialize;
use uuid::Uuid;

use crate::revalidate::event_path;
use crate::services::load_event;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionStatus {
    pub event_id: Uuid,
    pub subscribed: bool,
}

pub async fn subscription_status<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
) -> Result<SubscriptionStatus, AppError> {
    load_event(&state.store, event_id).await?;
    let subscribed = state
        .store
        .find_subscription(user_id, event_id)
        .await?
        .is_some();
    Ok(SubscriptionStatus {
        event_id,
        subscribed,
    })
}

/// Flips the user's subscription to event updates.
pub async fn toggle_subscription<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
) -> Result<SubscriptionStatus, AppError> {
    load_event(&state.store, event_id).await?;

    let subscribed = match state.store.find_subscription(user_id, event_id).await? {
        Some(_) => {
            state.store.delete_subscription(user_id, event_id).await?;
            false
        }
        None => {
            state.store.create_subscription(user_id, event_id).await?;
            true
        }
    };

    state.revalidator.revalidate(&event_path(event_id));
    tracing::info!(user_id, %event_id, subscribed, "Subscription toggled");
    Ok(SubscriptionStatus {
        event_id,
        subscribed,
    })
}
