use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;

use crate::services::users::{self, IdentityEvent};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::webhook::verify_identity_webhook;

pub async fn get_user<S: Store>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let profile = users::public_profile(&state, &user_id).await?;
    Ok(success(profile, "User retrieved"))
}

/// Receives user lifecycle events from the identity provider. The signature
/// is checked against the raw body before the payload is parsed.
pub async fn identity_webhook<S: Store>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    verify_identity_webhook(
        state.config.identity_webhook_secret.as_ref(),
        &headers,
        &body,
        Utc::now().timestamp(),
    )?;

    let event: IdentityEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Invalid webhook payload: {e}")))?;

    let outcome = users::sync_identity(&state, event).await?;
    Ok(success(outcome, "Webhook processed"))
}
