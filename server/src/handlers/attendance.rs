use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::handlers::{IdPath, JsonBody};
use crate::models::AttendanceResponse;
use crate::services::attendance;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// `null` or a missing `response` withdraws the user's answer.
#[derive(Debug, Deserialize)]
pub struct AttendanceForm {
    #[serde(default)]
    pub response: Option<AttendanceResponse>,
}

pub async fn respond<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
    JsonBody(form): JsonBody<AttendanceForm>,
) -> Result<Response, AppError> {
    let attendance = attendance::respond(&state, &user.user_id, event_id, form.response).await?;
    let message = if attendance.is_some() {
        "Attendance saved"
    } else {
        "Attendance cleared"
    };
    Ok(success(attendance, message))
}

pub async fn list_attendance<S: Store>(
    State(state): State<AppState<S>>,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let attendees = attendance::list_attendance(&state, event_id).await?;
    Ok(success(attendees, "Attendance retrieved"))
}
