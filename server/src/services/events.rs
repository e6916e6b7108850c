use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AttendanceResponse, Attendee, Event, EventDraft, Post, PostType, PublicUser, RespondedEvent,
};
use crate::revalidate::{event_path, DASHBOARD_PATH};
use crate::services::changes::detect_changes;
use crate::services::posts::{publish, PublishedPost};
use crate::services::{ensure_host, load_event};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::datetime::combine_date_time;
use crate::utils::error::AppError;
use crate::utils::validation::{
    optional_text, parse_time_of_day, require_text, validate_coordinate, MAX_DESCRIPTION_LEN,
    MAX_LOCATION_LEN, MAX_TITLE_LEN, MAX_URL_LEN,
};

/// Event fields as submitted by the create and edit forms. Dates and times
/// of day arrive separately and are interpreted in the event time zone.
#[derive(Debug, Clone, Deserialize)]
pub struct EventForm {
    pub title: String,
    pub description: Option<String>,
    pub location_address: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub image_url: Option<String>,
    pub date_from: NaiveDate,
    pub time_from: String,
    pub date_to: Option<NaiveDate>,
    pub time_to: Option<String>,
}

impl EventForm {
    /// Validates the form, stopping at the first problem.
    ///
    /// An end time without an end date ends the event on its start day.
    pub fn into_draft(self, tz: Tz) -> Result<EventDraft, AppError> {
        let title = require_text("Title", &self.title, MAX_TITLE_LEN)?;
        let description =
            optional_text("Description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        let location_address =
            optional_text("Location", self.location_address.as_deref(), MAX_LOCATION_LEN)?;
        let image_url = optional_text("Image URL", self.image_url.as_deref(), MAX_URL_LEN)?;

        let date_from = combine_date_time(self.date_from, parse_time_of_day(&self.time_from)?, tz)?;

        let time_to = self.time_to.as_deref().map(parse_time_of_day).transpose()?;
        let date_to = match (self.date_to, time_to) {
            (Some(date), Some(time)) => Some(combine_date_time(date, time, tz)?),
            (Some(_), None) => {
                return Err(AppError::ValidationError(
                    "End time is required when an end date is set".to_string(),
                ))
            }
            (None, Some(time)) => Some(combine_date_time(self.date_from, time, tz)?),
            (None, None) => None,
        };
        if let Some(end) = date_to {
            if end < date_from {
                return Err(AppError::ValidationError(
                    "Event cannot end before it starts".to_string(),
                ));
            }
        }

        validate_coordinate("Latitude", self.location_lat, 90.0)?;
        validate_coordinate("Longitude", self.location_lon, 180.0)?;

        // Coordinates belong to an address; drop them with it.
        let (location_lat, location_lon) = match location_address {
            Some(_) => (self.location_lat, self.location_lon),
            None => (None, None),
        };

        Ok(EventDraft {
            title,
            description,
            location_address,
            location_lat,
            location_lon,
            image_url,
            date_from,
            date_to,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageForm {
    pub image_url: String,
}

/// The requester's own relationship to an event.
#[derive(Debug, Serialize, PartialEq)]
pub struct ViewerState {
    pub is_host: bool,
    pub response: Option<AttendanceResponse>,
    pub subscribed: bool,
}

#[derive(Debug, Serialize)]
pub struct EventDetails {
    pub event: Event,
    pub host: Option<PublicUser>,
    pub attendance: Vec<Attendee>,
    pub posts: Vec<Post>,
    pub viewer: Option<ViewerState>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedEvent {
    pub event: Event,
    /// The automatic post, when the date or location changed.
    pub announcement: Option<PublishedPost>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub hosted: Vec<Event>,
    pub responded: Vec<RespondedEvent>,
}

/// Creates the event with the host already attending.
pub async fn create_event<S: Store>(
    state: &AppState<S>,
    host_id: &str,
    form: EventForm,
) -> Result<Event, AppError> {
    let draft = form.into_draft(state.config.event_timezone)?;
    let event = state.store.create_event(host_id, draft).await?;

    state.revalidator.revalidate(DASHBOARD_PATH);
    tracing::info!(event_id = %event.id, host_id, "Event created");
    Ok(event)
}

pub async fn get_event<S: Store>(
    state: &AppState<S>,
    viewer_id: Option<&str>,
    event_id: Uuid,
) -> Result<EventDetails, AppError> {
    let event = load_event(&state.store, event_id).await?;
    let host = state
        .store
        .find_user(&event.host_id)
        .await?
        .map(PublicUser::from);
    let attendance = state.store.list_attendees(event_id).await?;
    let posts = state.store.list_posts(event_id).await?;

    let viewer = match viewer_id {
        Some(user_id) => {
            let response = attendance
                .iter()
                .find(|attendee| attendee.user_id == user_id)
                .map(|attendee| attendee.response);
            let subscribed = state
                .store
                .find_subscription(user_id, event_id)
                .await?
                .is_some();
            Some(ViewerState {
                is_host: event.is_hosted_by(user_id),
                response,
                subscribed,
            })
        }
        None => None,
    };

    Ok(EventDetails {
        event,
        host,
        attendance,
        posts,
        viewer,
    })
}

/// Applies the host's edits, then announces any date or location change
/// with an automatic post. The old state is captured before writing.
pub async fn update_event<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
    form: EventForm,
) -> Result<UpdatedEvent, AppError> {
    let old = load_event(&state.store, event_id).await?;
    ensure_host(&old, user_id)?;
    let draft = form.into_draft(state.config.event_timezone)?;

    let new_location = draft.location_address.clone();
    let new_start = draft.date_from;
    let event = state.store.update_event(event_id, draft).await?;
    state.revalidator.revalidate(DASHBOARD_PATH);
    state.revalidator.revalidate(&event_path(event_id));
    tracing::info!(%event_id, "Event updated");

    let announcement = match detect_changes(&old, new_location.as_deref(), new_start) {
        Some(change) => {
            let message = change.message(state.config.event_timezone, Utc::now());
            Some(publish(state, &event, &message, PostType::Auto).await?)
        }
        None => None,
    };

    Ok(UpdatedEvent {
        event,
        announcement,
    })
}

/// Deletes the event along with its attendance, posts and subscriptions.
pub async fn delete_event<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
) -> Result<Event, AppError> {
    let event = load_event(&state.store, event_id).await?;
    ensure_host(&event, user_id)?;

    state.store.delete_event(event_id).await?;
    state.revalidator.revalidate(&event_path(event_id));
    state.revalidator.revalidate(DASHBOARD_PATH);
    tracing::info!(%event_id, "Event deleted");
    Ok(event)
}

pub async fn set_event_image<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
    form: ImageForm,
) -> Result<Event, AppError> {
    let image_url = optional_text("Image URL", Some(form.image_url.as_str()), MAX_URL_LEN)?
        .ok_or_else(|| AppError::ValidationError("Image URL is required".to_string()))?;
    replace_image(state, user_id, event_id, Some(image_url)).await
}

pub async fn clear_event_image<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
) -> Result<Event, AppError> {
    replace_image(state, user_id, event_id, None).await
}

async fn replace_image<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
    image_url: Option<String>,
) -> Result<Event, AppError> {
    let event = load_event(&state.store, event_id).await?;
    ensure_host(&event, user_id)?;

    let event = state.store.set_event_image(event_id, image_url).await?;
    state.revalidator.revalidate(&event_path(event_id));
    Ok(event)
}

pub async fn dashboard<S: Store>(
    state: &AppState<S>,
    user_id: &str,
) -> Result<Dashboard, AppError> {
    Ok(Dashboard {
        hosted: state.store.list_hosted_events(user_id).await?,
        responded: state.store.list_responded_events(user_id).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::RecordingMailer;
    use crate::services::fixtures::{harness, harness_with_mailer, profile, seeded_event, Harness};
    use crate::services::notifications::NotificationOutcome;
    use chrono::TimeZone;

    fn form(location: Option<&str>, date: (i32, u32, u32), time: &str) -> EventForm {
        EventForm {
            title: "Housewarming".to_string(),
            description: None,
            location_address: location.map(str::to_string),
            location_lat: None,
            location_lon: None,
            image_url: None,
            date_from: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time_from: time.to_string(),
            date_to: None,
            time_to: None,
        }
    }

    async fn host_event(h: &Harness) -> Event {
        h.state.store.create_user(profile("host")).await.unwrap();
        h.state.store.create_user(profile("guest")).await.unwrap();
        create_event(&h.state, "host", form(Some("Prague"), (2024, 1, 1), "10:00"))
            .await
            .unwrap()
    }

    #[test]
    fn test_form_combines_date_and_time_in_zone() {
        let draft = form(Some(" Prague "), (2024, 1, 1), "10:00")
            .into_draft(chrono_tz::Europe::Prague)
            .unwrap();
        assert_eq!(
            draft.date_from,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(draft.location_address.as_deref(), Some("Prague"));
    }

    #[test]
    fn test_form_rejects_end_before_start() {
        let mut f = form(None, (2024, 1, 2), "10:00");
        f.date_to = NaiveDate::from_ymd_opt(2024, 1, 1);
        f.time_to = Some("12:00".to_string());
        let err = f.into_draft(chrono_tz::UTC).unwrap_err();
        assert_eq!(err.public_message(), "Event cannot end before it starts");
    }

    #[test]
    fn test_form_reports_first_violation() {
        let mut f = form(None, (2024, 1, 1), "25:00");
        f.title = String::new();
        let err = f.into_draft(chrono_tz::UTC).unwrap_err();
        assert_eq!(err.public_message(), "Title is required");
    }

    #[test]
    fn test_form_end_time_without_end_date_uses_start_day() {
        let mut f = form(None, (2024, 1, 1), "10:00");
        f.time_to = Some("14:00".to_string());
        let draft = f.into_draft(chrono_tz::UTC).unwrap();
        assert_eq!(
            draft.date_to,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_form_drops_coordinates_without_address() {
        let mut f = form(Some(""), (2024, 1, 1), "10:00");
        f.location_lat = Some(50.0);
        f.location_lon = Some(14.4);
        let draft = f.into_draft(chrono_tz::UTC).unwrap();
        assert_eq!(draft.location_address, None);
        assert_eq!((draft.location_lat, draft.location_lon), (None, None));
    }

    #[tokio::test]
    async fn test_create_event_adds_host_attendance() {
        let h = harness();
        let event = host_event(&h).await;

        let attendance = h
            .state
            .store
            .find_attendance("host", event.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attendance.response, AttendanceResponse::Yes);
        assert_eq!(h.revalidator.paths(), vec![DASHBOARD_PATH.to_string()]);
    }

    #[tokio::test]
    async fn test_location_change_announces_once() {
        let h = harness();
        let event = host_event(&h).await;

        let updated = update_event(
            &h.state,
            "host",
            event.id,
            form(Some("Brno"), (2024, 1, 1), "10:00"),
        )
        .await
        .unwrap();

        let announcement = updated.announcement.unwrap();
        assert_eq!(announcement.post.post_type, PostType::Auto);
        assert_eq!(announcement.post.message, "Location was changed to Brno");
        let posts = h.state.store.list_posts(event.id).await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_date_and_location_change_emails_subscribers() {
        let h = harness();
        let event = host_event(&h).await;
        h.state.store.create_subscription("guest", event.id).await.unwrap();

        let updated = update_event(
            &h.state,
            "host",
            event.id,
            form(Some("Berlin"), (2024, 2, 1), "12:00"),
        )
        .await
        .unwrap();

        let announcement = updated.announcement.unwrap();
        assert!(announcement
            .post
            .message
            .starts_with("Date was changed to Thu, 1 Feb at 12:00"));
        assert!(announcement
            .post
            .message
            .ends_with(" and location was changed to Berlin"));
        assert_eq!(
            announcement.notification,
            NotificationOutcome::Sent { recipients: 1 }
        );
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Important changes in Housewarming");
    }

    #[tokio::test]
    async fn test_other_field_edits_do_not_announce() {
        let h = harness();
        let event = host_event(&h).await;

        let mut edit = form(Some("Prague"), (2024, 1, 1), "10:00");
        edit.description = Some("Now with cake".to_string());
        edit.title = "Housewarming party".to_string();
        let updated = update_event(&h.state, "host", event.id, edit).await.unwrap();

        assert!(updated.announcement.is_none());
        assert_eq!(updated.event.description.as_deref(), Some("Now with cake"));
        assert!(h.state.store.list_posts(event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_cannot_update_or_delete() {
        let h = harness();
        let event = host_event(&h).await;

        let err = update_event(
            &h.state,
            "guest",
            event.id,
            form(Some("Brno"), (2024, 1, 1), "10:00"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = delete_event(&h.state, "guest", event.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_announcement_survives_mail_failure() {
        let h = harness_with_mailer(RecordingMailer::failing("smtp down"));
        let event = host_event(&h).await;
        h.state.store.create_subscription("guest", event.id).await.unwrap();

        let updated = update_event(
            &h.state,
            "host",
            event.id,
            form(Some("Brno"), (2024, 1, 1), "10:00"),
        )
        .await
        .unwrap();

        let announcement = updated.announcement.unwrap();
        assert!(matches!(
            announcement.notification,
            NotificationOutcome::Failed { .. }
        ));
        assert_eq!(h.state.store.list_posts(event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_event_details_for_viewer() {
        let h = harness();
        let event = seeded_event(&h).await;
        h.state.store.create_subscription("guest", event.id).await.unwrap();

        let details = get_event(&h.state, Some("guest"), event.id).await.unwrap();
        assert_eq!(details.host.unwrap().id, "host");
        assert_eq!(details.attendance.len(), 1);
        assert_eq!(
            details.viewer,
            Some(ViewerState {
                is_host: false,
                response: None,
                subscribed: true,
            })
        );

        let anonymous = get_event(&h.state, None, event.id).await.unwrap();
        assert!(anonymous.viewer.is_none());
    }

    #[tokio::test]
    async fn test_delete_event_revalidates_both_views() {
        let h = harness();
        let event = seeded_event(&h).await;

        delete_event(&h.state, "host", event.id).await.unwrap();

        assert!(h.state.store.find_event(event.id).await.unwrap().is_none());
        assert_eq!(
            h.revalidator.paths(),
            vec![event_path(event.id), DASHBOARD_PATH.to_string()]
        );
    }

    #[tokio::test]
    async fn test_image_set_and_clear() {
        let h = harness();
        let event = seeded_event(&h).await;

        let with_image = set_event_image(
            &h.state,
            "host",
            event.id,
            ImageForm {
                image_url: "https://cdn.example.com/cover.jpg".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            with_image.image_url.as_deref(),
            Some("https://cdn.example.com/cover.jpg")
        );

        let cleared = clear_event_image(&h.state, "host", event.id).await.unwrap();
        assert!(cleared.image_url.is_none());
    }

    #[tokio::test]
    async fn test_dashboard_splits_hosted_and_responded() {
        let h = harness();
        let event = seeded_event(&h).await;
        h.state
            .store
            .create_attendance("guest", event.id, AttendanceResponse::Maybe)
            .await
            .unwrap();

        let host_view = dashboard(&h.state, "host").await.unwrap();
        assert_eq!(host_view.hosted.len(), 1);
        assert!(host_view.responded.is_empty());

        let guest_view = dashboard(&h.state, "guest").await.unwrap();
        assert!(guest_view.hosted.is_empty());
        assert_eq!(guest_view.responded[0].event.id, event.id);
    }
}
