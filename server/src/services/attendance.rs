use uuid::Uuid;

use crate::models::{Attendance, AttendanceResponse, Attendee};
use crate::revalidate::event_path;
use crate::services::load_event;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;

/// The single persistence step needed to move an attendance row to the
/// desired response.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceAction {
    Create(AttendanceResponse),
    Update(AttendanceResponse),
    Delete,
    /// The row already holds the desired response.
    Keep(Attendance),
    /// No row exists and none is wanted.
    Nothing,
}

/// Decides how to get from `existing` to `desired`. `None` as the desired
/// response means the user withdraws their answer.
pub fn reconcile(
    existing: Option<&Attendance>,
    desired: Option<AttendanceResponse>,
) -> AttendanceAction {
    match (existing, desired) {
        (Some(_), None) => AttendanceAction::Delete,
        (Some(current), Some(response)) if current.response == response => {
            AttendanceAction::Keep(current.clone())
        }
        (Some(_), Some(response)) => AttendanceAction::Update(response),
        (None, None) => AttendanceAction::Nothing,
        (None, Some(response)) => AttendanceAction::Create(response),
    }
}

/// Records the user's answer to an event. Returns the resulting row, or
/// `None` when the user has no answer on record afterwards.
pub async fn respond<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
    desired: Option<AttendanceResponse>,
) -> Result<Option<Attendance>, AppError> {
    load_event(&state.store, event_id).await?;

    let existing = state.store.find_attendance(user_id, event_id).await?;
    let action = reconcile(existing.as_ref(), desired);
    tracing::debug!(user_id, %event_id, ?action, "Reconciled attendance");

    let attendance = match action {
        AttendanceAction::Keep(current) => return Ok(Some(current)),
        AttendanceAction::Nothing => return Ok(None),
        AttendanceAction::Create(response) => Some(
            state
                .store
                .create_attendance(user_id, event_id, response)
                .await?,
        ),
        AttendanceAction::Update(response) => Some(
            state
                .store
                .update_attendance(user_id, event_id, response)
                .await?,
        ),
        AttendanceAction::Delete => {
            state.store.delete_attendance(user_id, event_id).await?;
            None
        }
    };

    state.revalidator.revalidate(&event_path(event_id));
    tracing::info!(
        user_id,
        %event_id,
        response = ?attendance.as_ref().map(|a| a.response),
        "Attendance updated"
    );
    Ok(attendance)
}

pub async fn list_attendance<S: Store>(
    state: &AppState<S>,
    event_id: Uuid,
) -> Result<Vec<Attendee>, AppError> {
    load_event(&state.store, event_id).await?;
    Ok(state.store.list_attendees(event_id).await?)
}
