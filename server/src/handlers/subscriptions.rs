use axum::extract::State;
use axum::response::Response;

use crate::auth::AuthUser;
use crate::handlers::IdPath;
use crate::services::subscriptions;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn subscription_status<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let status = subscriptions::subscription_status(&state, &user.user_id, event_id).await?;
    Ok(success(status, "Subscription retrieved"))
}

pub async fn toggle_subscription<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let status = subscriptions::toggle_subscription(&state, &user.user_id, event_id).await?;
    let message = if status.subscribed {
        "Subscribed to event updates"
    } else {
        "Unsubscribed from event updates"
    };
    Ok(success(status, message))
}
