use axum::extract::State;
use axum::response::Response;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::handlers::{IdPath, JsonBody};
use crate::services::events::{self, EventForm, ImageForm};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_event<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    JsonBody(form): JsonBody<EventForm>,
) -> Result<Response, AppError> {
    let event = events::create_event(&state, &user.user_id, form).await?;
    Ok(created(event, "Event created"))
}

pub async fn get_event<S: Store>(
    State(state): State<AppState<S>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let viewer_id = viewer.as_ref().map(|user| user.user_id.as_str());
    let details = events::get_event(&state, viewer_id, event_id).await?;
    Ok(success(details, "Event retrieved"))
}

pub async fn update_event<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
    JsonBody(form): JsonBody<EventForm>,
) -> Result<Response, AppError> {
    let updated = events::update_event(&state, &user.user_id, event_id, form).await?;
    Ok(success(updated, "Event updated"))
}

pub async fn delete_event<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let event = events::delete_event(&state, &user.user_id, event_id).await?;
    Ok(success(event, "Event deleted"))
}

pub async fn set_event_image<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
    JsonBody(form): JsonBody<ImageForm>,
) -> Result<Response, AppError> {
    let event = events::set_event_image(&state, &user.user_id, event_id, form).await?;
    Ok(success(event, "Event image updated"))
}

pub async fn clear_event_image<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let event = events::clear_event_image(&state, &user.user_id, event_id).await?;
    Ok(success(event, "Event image removed"))
}

pub async fn dashboard<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let dashboard = events::dashboard(&state, &user.user_id).await?;
    Ok(success(dashboard, "Dashboard retrieved"))
}
